use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a DynamoDB item: a map of attribute names to values.
///
/// Every item in the demo table carries the string hash key `id`. Other
/// attributes are free-form. A key is itself an `Item` holding only the
/// hash key attribute, which is the shape `DeleteRequest` expects.
///
/// # Example
///
/// ```
/// let record = Record { id: "0-0".into(), name: "item-0-0".into() };
/// let item = Item::from_record(&record)?;
/// let key = item.key("id").unwrap();
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) attributes: HashMap<String, AttributeValue>,
}

/// The typed shape of the rows the demo writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
}

impl Item {
    /// Builds an item from any serializable value.
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, serde_dynamo::Error> {
        Ok(Self {
            attributes: serde_dynamo::to_item(record)?,
        })
    }

    /// Projects the item down to its key.
    ///
    /// Returns `None` if the item lacks the hash key attribute.
    pub fn key(&self, hash_key: &str) -> Option<Item> {
        self.attributes.get(hash_key).map(|value| Item {
            attributes: HashMap::from([(hash_key.to_string(), value.clone())]),
        })
    }
}

#[cfg(test)]
impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::S(value.into()));
        self
    }

    /// Returns `None` if the attribute doesn't exist or is not a string.
    pub fn get_string(&self, key: &str) -> Option<&String> {
        self.attributes.get(key).and_then(|av| av.as_s().ok())
    }

    pub fn to_record<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_dynamo::Error> {
        serde_dynamo::from_item(self.attributes.clone())
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }
}
