//! Path expressions used by [`Reference::path`](super::Reference::path).
//!
//! A path is a slash separated list of segments:
//!
//! - `name` selects an object key or array index
//! - `..` steps back to the previously visited value, or out of the start
//!   value into the values enclosing it
//! - `*` selects every direct child
//! - `**` selects the value itself and all of its descendants
//! - a segment containing regular expression syntax (`a|b`, `item[0-9]`)
//!   selects every child whose key matches it completely
//!
//! A leading `/` makes the path absolute (resolved from the root context).

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

/// One step of a path.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    Key(String),
    Parent,
    Any,
    Deep,
    Pattern(Regex),
}

impl Segment {
    fn parse(segment: &str) -> Self {
        match segment {
            ".." => Self::Parent,
            "*" => Self::Any,
            "**" => Self::Deep,
            s if is_pattern(s) => match Regex::new(&format!("^(?:{})$", s)) {
                Ok(regex) => Self::Pattern(regex),
                Err(_) => Self::Key(s.to_string()),
            },
            s => Self::Key(s.to_string()),
        }
    }

    fn is_multi(&self) -> bool {
        matches!(self, Self::Any | Self::Deep | Self::Pattern(_))
    }
}

fn is_pattern(segment: &str) -> bool {
    segment
        .chars()
        .any(|c| matches!(c, '|' | '(' | '[' | '^' | '$' | '+' | '?' | '\\' | '{'))
}

/// A parsed path expression.
#[derive(Debug, Clone)]
pub(crate) struct Path {
    pub absolute: bool,
    pub segments: Vec<Segment>,
}

impl Path {
    pub fn parse(path: &str) -> Self {
        let absolute = path.starts_with('/');
        let segments = path
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .map(Segment::parse)
            .collect();
        Self { absolute, segments }
    }

    /// Number of values above the start that `..` segments may step back to.
    ///
    /// `**` counts as zero levels, so this is an upper bound.
    pub fn ascent(&self) -> usize {
        let mut depth: isize = 0;
        let mut lowest: isize = 0;
        for segment in &self.segments {
            match segment {
                Segment::Parent => {
                    depth -= 1;
                    lowest = lowest.min(depth);
                }
                Segment::Deep => {}
                _ => depth += 1,
            }
        }
        lowest.unsigned_abs()
    }

    /// Whether the path may select more than one value.
    pub fn is_multi(&self) -> bool {
        self.segments.iter().any(Segment::is_multi)
    }

    /// Select the values reached from `start`.
    ///
    /// `above` holds the values enclosing `start`, outermost first. A `..`
    /// at `start` steps back into them. Non-matching paths give `None`. Paths
    /// with wildcards or patterns give the single match directly and several
    /// matches as an array.
    pub fn select(&self, start: &Value, above: &[Value]) -> Option<Value> {
        let mut hits = vec![Hit {
            value: start,
            trail: above.iter().collect(),
        }];
        for segment in &self.segments {
            hits = hits
                .into_iter()
                .flat_map(|hit| hit.step(segment))
                .collect();
            if hits.is_empty() {
                return None;
            }
        }
        if !self.is_multi() {
            return hits.into_iter().next().map(|hit| hit.value.clone());
        }
        match hits.len() {
            0 => None,
            1 => hits.pop().map(|hit| hit.value.clone()),
            _ => Some(Value::Array(hits.into_iter().map(|hit| hit.value.clone()).collect())),
        }
    }
}

/// A selected value together with the values visited to reach it.
#[derive(Debug, Clone)]
struct Hit<'a> {
    value: &'a Value,
    trail: Vec<&'a Value>,
}

impl<'a> Hit<'a> {
    fn descend(&self, value: &'a Value) -> Self {
        let mut trail = Vec::with_capacity(self.trail.len() + 1);
        trail.extend_from_slice(&self.trail);
        trail.push(self.value);
        Self { value, trail }
    }

    fn children(&self) -> Vec<(Cow<'a, str>, &'a Value)> {
        match self.value {
            Value::Object(map) => map.iter().map(|(k, v)| (Cow::Borrowed(k.as_str()), v)).collect(),
            Value::Array(list) => list
                .iter()
                .enumerate()
                .map(|(i, v)| (Cow::Owned(i.to_string()), v))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn step(self, segment: &Segment) -> Vec<Hit<'a>> {
        match segment {
            Segment::Key(key) => crate::context::child(self.value, key)
                .map(|value| vec![self.descend(value)])
                .unwrap_or_default(),
            Segment::Parent => {
                let mut trail = self.trail;
                match trail.pop() {
                    Some(value) => vec![Hit { value, trail }],
                    None => Vec::new(),
                }
            }
            Segment::Any => self
                .children()
                .into_iter()
                .map(|(_, value)| self.descend(value))
                .collect(),
            Segment::Pattern(regex) => self
                .children()
                .into_iter()
                .filter(|(key, _)| regex.is_match(key))
                .map(|(_, value)| self.descend(value))
                .collect(),
            Segment::Deep => {
                let mut hits = Vec::new();
                self.collect_deep(&mut hits);
                hits
            }
        }
    }

    fn collect_deep(self, hits: &mut Vec<Hit<'a>>) {
        let children: Vec<Hit<'a>> = self
            .children()
            .into_iter()
            .map(|(_, value)| self.descend(value))
            .collect();
        hits.push(self);
        for child in children {
            child.collect_deep(hits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn select(path: &str, data: &Value) -> Option<Value> {
        Path::parse(path).select(data, &[])
    }

    #[test]
    fn test_parse_segments() {
        let path = Path::parse("/a/../b/*/**/x|y");
        assert!(path.absolute);
        assert_eq!(path.segments.len(), 6);
        assert!(matches!(path.segments[0], Segment::Key(ref k) if k == "a"));
        assert!(matches!(path.segments[1], Segment::Parent));
        assert!(matches!(path.segments[3], Segment::Any));
        assert!(matches!(path.segments[4], Segment::Deep));
        assert!(matches!(path.segments[5], Segment::Pattern(_)));
        assert!(path.is_multi());
    }

    #[test]
    fn test_ascent() {
        assert_eq!(Path::parse("../../b").ascent(), 2);
        assert_eq!(Path::parse("x/../../b").ascent(), 1);
        assert_eq!(Path::parse("a/b/../c").ascent(), 0);
        assert_eq!(Path::parse("**/..").ascent(), 1);
        assert!(!Path::parse("../../b").is_multi());
    }

    #[test]
    fn test_plain_keys_and_indexes() {
        let data = json!({"a": {"b": [1, 2, 3]}});
        assert_eq!(select("a/b/1", &data), Some(json!(2)));
        assert_eq!(select("a/c", &data), None);
        assert_eq!(select("", &data), Some(data.clone()));
    }

    #[test]
    fn test_single_wildcard() {
        let data = json!({"a": {"x": 1}, "b": {"x": 2}, "c": {"y": 3}});
        assert_eq!(select("*/x", &data), Some(json!([1, 2])));
        assert_eq!(select("*/y", &data), Some(json!(3)));
        assert_eq!(select("*/z", &data), None);
    }

    #[test]
    fn test_deep_wildcard() {
        let data = json!({
            "europe": {"germany": {"bavaria": {"munich": 1_500_000}}},
            "asia": {"japan": {"tokyo": 14_000_000}}
        });
        assert_eq!(select("**/munich", &data), Some(json!(1_500_000)));
        assert_eq!(select("**/paris", &data), None);
    }

    #[test]
    fn test_pattern_alternation() {
        let data = json!({"name": "x", "nick": "y", "age": 3});
        assert_eq!(select("name|nick", &data), Some(json!(["x", "y"])));
        assert_eq!(select("ag(e|ent)", &data), Some(json!(3)));
        assert_eq!(select("foo|bar", &data), None);
    }

    #[test]
    fn test_parent_after_wildcard() {
        let data = json!({"a": {"flag": true, "v": 1}, "b": {"v": 2}});
        assert_eq!(select("*/flag/../v", &data), Some(json!(1)));
    }

    #[test]
    fn test_parent_requires_existing_key() {
        let data = json!({"a": 1});
        assert_eq!(select("missing/..", &data), None);
        assert_eq!(select("a/..", &data), Some(data.clone()));
    }

    #[test]
    fn test_parent_without_trail() {
        let data = json!({"a": 1});
        assert_eq!(select("*/..", &data), Some(data.clone()));
        assert_eq!(select("..", &data), None);
    }

    #[test]
    fn test_parent_steps_into_enclosing_values() {
        let outer = json!({"a": {"x": 1}, "b": 2});
        let start = json!({"x": 1});
        let path = Path::parse("x/../../b");
        assert_eq!(path.select(&start, &[outer.clone()]), Some(json!(2)));
        assert_eq!(Path::parse("../b").select(&start, &[outer]), Some(json!(2)));
        assert_eq!(path.select(&start, &[]), None);
    }

    #[test]
    fn test_deep_wildcard_on_wide_object() {
        let mut map = Map::new();
        for i in 0..5_000 {
            map.insert(
                format!("k{}", i),
                json!({"a": {"b": {"c": i}}, "list": [1, 2, 3]}),
            );
        }
        map.insert("target".to_string(), json!({"munich": 1}));
        let data = Value::Object(map);
        assert_eq!(select("**/munich", &data), Some(json!(1)));
        assert_eq!(select("**/c", &data).and_then(|v| v.as_array().map(Vec::len)), Some(5_000));
    }
}
