use std::fmt;

use indexmap::IndexMap;

/// An attribute value attached to a cube or coordinate.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(value) => write!(f, "{value}"),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

/// Attribute mapping. Insertion order is kept for display; equality is
/// key-set based, so two mappings with the same entries in a different
/// order compare equal.
pub type Attributes = IndexMap<String, AttrValue>;

/// One entry of a cube's cell-method provenance, e.g. "mean: time".
/// The sequence of cell methods on a cube is order-sensitive.
#[derive(Clone, Debug, PartialEq)]
pub struct CellMethod {
    pub method: String,
    pub coord_names: Vec<String>,
    pub intervals: Vec<String>,
    pub comments: Vec<String>,
}

impl CellMethod {
    pub fn new<S: Into<String>>(method: S, coord_names: &[&str]) -> Self {
        Self {
            method: method.into(),
            coord_names: coord_names.iter().map(|name| name.to_string()).collect(),
            intervals: vec![],
            comments: vec![],
        }
    }

    pub fn with_interval<S: Into<String>>(mut self, interval: S) -> Self {
        self.intervals.push(interval.into());
        self
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comments.push(comment.into());
        self
    }
}

impl fmt::Display for CellMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.method, self.coord_names.join(", "))?;
        if !self.intervals.is_empty() {
            write!(f, " (interval: {})", self.intervals.join(", "))?;
        }
        if !self.comments.is_empty() {
            write!(f, " ({})", self.comments.join(", "))?;
        }
        Ok(())
    }
}

/// Identity and provenance of a cube's phenomenon.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CubeMetadata {
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub var_name: Option<String>,
    pub units: String,
    pub attributes: Attributes,
    pub cell_methods: Vec<CellMethod>,
}

impl CubeMetadata {
    pub fn new(standard_name: &str, units: &str) -> Self {
        Self {
            standard_name: Some(standard_name.to_string()),
            units: units.to_string(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_cell_method(mut self, cell_method: CellMethod) -> Self {
        self.cell_methods.push(cell_method);
        self
    }

    /// Best available name: standard name, then long name, then the
    /// variable name, then "unknown".
    pub fn name(&self) -> &str {
        best_name(&self.standard_name, &self.long_name, &self.var_name)
    }

    /// Every field-level mismatch between two metadata records, in a fixed
    /// field order. Empty when the records are equal; never fails.
    pub fn difference(&self, other: &Self) -> Vec<String> {
        let mut diffs = vec![];
        push_name_diff(&mut diffs, "standard_name", &self.standard_name, &other.standard_name);
        push_name_diff(&mut diffs, "long_name", &self.long_name, &other.long_name);
        push_name_diff(&mut diffs, "var_name", &self.var_name, &other.var_name);
        if self.units != other.units {
            diffs.push(format!("units differ: '{}' != '{}'", self.units, other.units));
        }
        push_attribute_diffs(&mut diffs, &self.attributes, &other.attributes);
        if self.cell_methods != other.cell_methods {
            diffs.push(format!(
                "cell_methods differ: [{}] != [{}]",
                display_list(&self.cell_methods),
                display_list(&other.cell_methods)
            ));
        }
        diffs
    }
}

/// Identity of a coordinate. Same contract as [`CubeMetadata`] without the
/// cell-method provenance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoordMetadata {
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub var_name: Option<String>,
    pub units: String,
    pub attributes: Attributes,
}

impl CoordMetadata {
    pub fn new(standard_name: &str, units: &str) -> Self {
        Self {
            standard_name: Some(standard_name.to_string()),
            units: units.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        best_name(&self.standard_name, &self.long_name, &self.var_name)
    }

    pub fn difference(&self, other: &Self) -> Vec<String> {
        let mut diffs = vec![];
        push_name_diff(&mut diffs, "standard_name", &self.standard_name, &other.standard_name);
        push_name_diff(&mut diffs, "long_name", &self.long_name, &other.long_name);
        push_name_diff(&mut diffs, "var_name", &self.var_name, &other.var_name);
        if self.units != other.units {
            diffs.push(format!("units differ: '{}' != '{}'", self.units, other.units));
        }
        push_attribute_diffs(&mut diffs, &self.attributes, &other.attributes);
        diffs
    }
}

fn best_name<'a>(
    standard_name: &'a Option<String>,
    long_name: &'a Option<String>,
    var_name: &'a Option<String>,
) -> &'a str {
    standard_name
        .as_deref()
        .or(long_name.as_deref())
        .or(var_name.as_deref())
        .unwrap_or("unknown")
}

fn push_name_diff(diffs: &mut Vec<String>, field: &str, a: &Option<String>, b: &Option<String>) {
    if a != b {
        diffs.push(format!(
            "{} differs: {} != {}",
            field,
            fmt_name(a),
            fmt_name(b)
        ));
    }
}

fn fmt_name(name: &Option<String>) -> String {
    match name {
        Some(name) => format!("'{name}'"),
        None => "None".to_string(),
    }
}

fn push_attribute_diffs(diffs: &mut Vec<String>, a: &Attributes, b: &Attributes) {
    let mut odd_keys: Vec<&str> = a
        .keys()
        .filter(|key| !b.contains_key(*key))
        .chain(b.keys().filter(|key| !a.contains_key(*key)))
        .map(String::as_str)
        .collect();
    odd_keys.sort_unstable();
    if !odd_keys.is_empty() {
        let listed: Vec<String> = odd_keys.iter().map(|key| format!("'{key}'")).collect();
        diffs.push(format!("attributes keys differ: {}", listed.join(", ")));
    }

    let mut shared: Vec<&str> = a
        .keys()
        .filter(|key| b.contains_key(*key))
        .map(String::as_str)
        .collect();
    shared.sort_unstable();
    for key in shared {
        let left = &a[key];
        let right = &b[key];
        if left != right {
            diffs.push(format!("attribute '{key}' differs: {left} != {right}"));
        }
    }
}

fn display_list<T: fmt::Display>(items: &[T]) -> String {
    let rendered: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    rendered.join(", ")
}

pub(crate) fn quoted_list(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("'{name}'")).collect();
    quoted.join(", ")
}
