//! Ordered sequences of [`Value`]. Supports index, iteration, size and
//! containment per §4.1's capability table.
use super::Value;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ListValue {
    elements: Vec<Value>,
    /// The declared element type when this list was produced by a typed
    /// source (§3.1 invariant c); `None` for lists assembled ad hoc.
    element_type: Option<super::types::Type>,
}

impl ListValue {
    pub fn new(elements: Vec<Value>) -> ListValue {
        ListValue {
            elements,
            element_type: None,
        }
    }

    pub fn typed(elements: Vec<Value>, element_type: super::types::Type) -> ListValue {
        ListValue {
            elements,
            element_type: Some(element_type),
        }
    }

    pub fn element_type(&self) -> Option<&super::types::Type> {
        self.element_type.as_ref()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.elements
    }

    pub fn contains(&self, needle: &Value) -> bool {
        self.elements.iter().any(|v| v.equals(needle).is_true())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_uses_value_equality() {
        let list = ListValue::new(vec![Value::Int(1), Value::Int(2)]);
        assert!(list.contains(&Value::Int(2)));
        assert!(!list.contains(&Value::Int(3)));
    }
}
