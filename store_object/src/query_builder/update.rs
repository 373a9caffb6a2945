use serde_json::Value;
use std::collections::BTreeMap;

/// Type of update operation to perform on a field
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Set field to a specific value: field = $N
    Set(Value),

    /// Increment field by a value: field = field + $N
    Increment(Value),

    /// Decrement field by a value: field = field - $N
    Decrement(Value),

    /// Multiply field by a value: field = field * $N
    Multiply(Value),

    /// Divide field by a value: field = field / $N
    Divide(Value),
}

impl UpdateOperation {
    /// SQL assignment for this operation, e.g. `field = field + $3`
    pub fn to_sql(&self, field_name: &str, param_number: usize) -> String {
        self.assignment_sql(field_name, field_name, &format!("${}", param_number))
    }

    /// SQL assignment to `field_name` reading the current value as
    /// `current` (a qualified name inside `ON CONFLICT DO UPDATE`)
    pub fn assignment_sql(&self, field_name: &str, current: &str, placeholder: &str) -> String {
        match self {
            UpdateOperation::Set(_) => format!("{} = {}", field_name, placeholder),
            UpdateOperation::Increment(_) => {
                format!("{} = {} + {}", field_name, current, placeholder)
            }
            UpdateOperation::Decrement(_) => {
                format!("{} = {} - {}", field_name, current, placeholder)
            }
            UpdateOperation::Multiply(_) => {
                format!("{} = {} * {}", field_name, current, placeholder)
            }
            UpdateOperation::Divide(_) => {
                format!("{} = {} / {}", field_name, current, placeholder)
            }
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            UpdateOperation::Set(v)
            | UpdateOperation::Increment(v)
            | UpdateOperation::Decrement(v)
            | UpdateOperation::Multiply(v)
            | UpdateOperation::Divide(v) => v,
        }
    }
}

/// Field assignments of an UPDATE, kept in column order so the generated
/// SQL is stable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    pub operations: BTreeMap<String, UpdateOperation>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.operations
            .insert(field.into(), UpdateOperation::Set(value));
        self
    }

    /// Set the field only when `value` is present
    pub fn set_opt(self, field: impl Into<String>, value: Option<Value>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    pub fn increment(mut self, field: impl Into<String>, value: Value) -> Self {
        self.operations
            .insert(field.into(), UpdateOperation::Increment(value));
        self
    }

    pub fn decrement(mut self, field: impl Into<String>, value: Value) -> Self {
        self.operations
            .insert(field.into(), UpdateOperation::Decrement(value));
        self
    }

    pub fn multiply(mut self, field: impl Into<String>, value: Value) -> Self {
        self.operations
            .insert(field.into(), UpdateOperation::Multiply(value));
        self
    }

    pub fn divide(mut self, field: impl Into<String>, value: Value) -> Self {
        self.operations
            .insert(field.into(), UpdateOperation::Divide(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_sql() {
        assert_eq!(UpdateOperation::Set(json!(1)).to_sql("title", 1), "title = $1");
        assert_eq!(
            UpdateOperation::Increment(json!(1)).to_sql("views", 2),
            "views = views + $2"
        );
        assert_eq!(
            UpdateOperation::Divide(json!(2)).to_sql("score", 4),
            "score = score / $4"
        );
        assert_eq!(
            UpdateOperation::Increment(json!(1)).assignment_sql("views", "posts.views", "$3"),
            "views = posts.views + $3"
        );
    }

    #[test]
    fn test_update_set_is_ordered_and_overwrites() {
        let set = UpdateSet::new()
            .set("title", json!("b"))
            .set("content", json!("a"))
            .set("title", json!("c"))
            .set_opt("published", None);

        assert_eq!(set.len(), 2);
        assert_eq!(set.fields().collect::<Vec<_>>(), vec!["content", "title"]);
        assert_eq!(set.operations["title"].value(), &json!("c"));
    }
}
