use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::FieldValue;

/// Kind of a field, deciding which values it accepts and how it is indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Free text, split into frames.
    Text,
    /// Short text kept as document metadata.
    CategoricalText,
    Numeric,
    Id,
    /// Text analysed by a caller supplied analyzer.
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub kind: FieldKind,
    pub indexed: bool,
    pub stored: bool,
    pub categorical: bool,
    pub analyzer: String,  // Analyzer name, resolved through the registry
}

impl FieldType {
    pub fn text() -> Self {
        FieldType {
            kind: FieldKind::Text,
            indexed: true,
            stored: true,
            categorical: false,
            analyzer: "standard".to_string(),
        }
    }

    pub fn categorical_text() -> Self {
        FieldType {
            kind: FieldKind::CategoricalText,
            indexed: true,
            stored: true,
            categorical: true,
            analyzer: "keyword".to_string(),
        }
    }

    pub fn numeric() -> Self {
        FieldType {
            kind: FieldKind::Numeric,
            indexed: true,
            stored: true,
            categorical: true,
            analyzer: "keyword".to_string(),
        }
    }

    pub fn id() -> Self {
        FieldType {
            kind: FieldKind::Id,
            indexed: true,
            stored: true,
            categorical: true,
            analyzer: "keyword".to_string(),
        }
    }

    pub fn custom(name: &str, analyzer: &str) -> Self {
        FieldType {
            kind: FieldKind::Custom(name.to_string()),
            indexed: true,
            stored: true,
            categorical: false,
            analyzer: analyzer.to_string(),
        }
    }

    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    pub fn categorical(mut self, categorical: bool) -> Self {
        self.categorical = categorical;
        self
    }

    pub fn with_analyzer(mut self, analyzer: &str) -> Self {
        self.analyzer = analyzer.to_string();
        self
    }

    /// Numbers and ids are metadata whatever the `categorical` flag says.
    fn always_structured(&self) -> bool {
        matches!(self.kind, FieldKind::Numeric | FieldKind::Id)
    }

    /// Indexed free-text field, producing frames.
    pub fn is_framed(&self) -> bool {
        self.indexed && !self.is_structured()
    }

    /// Indexed structured field, producing document metadata.
    pub fn is_structured(&self) -> bool {
        self.indexed && (self.categorical || self.always_structured())
    }

    /// Checks that `value` can be indexed by this field.
    pub fn check_value(&self, field: &str, value: &FieldValue) -> Result<()> {
        if !self.indexed {
            return Ok(());
        }

        let accepted = match self.kind {
            FieldKind::Text | FieldKind::CategoricalText | FieldKind::Custom(_) => {
                matches!(value, FieldValue::Text(_))
            }
            FieldKind::Numeric => matches!(value, FieldValue::Integer(_) | FieldValue::Float(_)),
            FieldKind::Id => matches!(value, FieldValue::Text(_) | FieldValue::Integer(_)),
        };

        if accepted {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::Type,
                format!("field '{}' of kind {:?} cannot index a {} value", field, self.kind, value.type_name()),
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
}

/// Ordered field definitions of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub format_version: u32,
    pub fields: Vec<FieldDefinition>,
}

impl Default for Schema {
    fn default() -> Self {
        Schema::new()
    }
}

impl Schema {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Schema {
            format_version: Self::FORMAT_VERSION,
            fields: Vec::new(),
        }
    }

    /// Builder form; a repeated name replaces the earlier definition.
    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.field_type = field_type,
            None => self.fields.push(FieldDefinition {
                name: name.to_string(),
                field_type,
            }),
        }
        self
    }

    /// Adds a field to an existing schema. Returns `false` when an identical
    /// definition already exists.
    pub fn add_field(&mut self, name: &str, field_type: FieldType) -> Result<bool> {
        if let Some(existing) = self.get(name) {
            if *existing == field_type {
                return Ok(false);
            }
            return Err(Error::invalid_argument(format!(
                "field '{}' already exists with type {:?}",
                name, existing.kind
            )));
        }

        self.fields.push(FieldDefinition {
            name: name.to_string(),
            field_type,
        });
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.field_type)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn framed_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.field_type.is_framed())
    }

    pub fn structured_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.field_type.is_structured())
    }

    pub fn check_format(&self) -> Result<()> {
        if self.format_version > Self::FORMAT_VERSION {
            return Err(Error::new(
                ErrorKind::SchemaMismatch,
                format!(
                    "schema format {} is newer than supported format {}",
                    self.format_version,
                    Self::FORMAT_VERSION
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_field_is_additive() {
        let mut schema = Schema::new().field("body", FieldType::text());
        assert!(schema.add_field("score", FieldType::numeric()).unwrap());
        assert!(!schema.add_field("body", FieldType::text()).unwrap());

        let err = schema.add_field("body", FieldType::numeric()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["body", "score"]);
    }

    #[test]
    fn text_fields_reject_non_text_values() {
        let text = FieldType::text();
        assert!(text.check_value("body", &FieldValue::Text("hi".into())).is_ok());
        let err = text.check_value("body", &FieldValue::Boolean(false)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);

        let unindexed = FieldType::text().indexed(false);
        assert!(unindexed.check_value("body", &FieldValue::Boolean(false)).is_ok());
    }

    #[test]
    fn field_names_may_contain_spaces() {
        let schema = Schema::new()
            .field("the body", FieldType::text())
            .field("doc id", FieldType::id());
        assert!(schema.get("the body").unwrap().is_framed());
        assert!(schema.get("doc id").unwrap().is_structured());
        assert_eq!(schema.framed_fields().count(), 1);
    }

    #[test]
    fn numbers_and_ids_stay_structured_when_not_categorical() {
        for field_type in [FieldType::numeric(), FieldType::id()] {
            let loose = field_type.categorical(false);
            assert!(loose.is_structured());
            assert!(!loose.is_framed());
            assert!(!loose.clone().indexed(false).is_structured());
        }
        assert!(FieldType::categorical_text().categorical(false).is_framed());
    }
}
