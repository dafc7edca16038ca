use std::collections::BTreeMap;
use tracing::debug;
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::analysis::token::Token;
use crate::core::error::Result;
use crate::core::types::{AttributeValue, DocId, Document, FieldValue, FrameId};
use crate::index::frame::Frame;
use crate::schema::schema::{FieldKind, FieldType, Schema};

/// Frame of a document that has not been assigned ids yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDraft {
    pub field: String,
    pub sequence: u32,
    pub terms: Vec<(String, u32)>,
    pub text: Option<String>,
}

/// Output of analysing one document.
#[derive(Debug, Clone, Default)]
pub struct FramedDocument {
    pub fields: BTreeMap<String, FieldValue>,
    pub metadata: BTreeMap<String, Vec<AttributeValue>>,
    pub frames: Vec<FrameDraft>,
}

impl FramedDocument {
    /// Assigns `doc_id` and consecutive frame ids starting at `first_frame_id`.
    pub fn assign(self, doc_id: DocId, first_frame_id: u64) -> (Document, Vec<Frame>) {
        let frames = self
            .frames
            .into_iter()
            .enumerate()
            .map(|(i, draft)| Frame {
                id: FrameId(first_frame_id + i as u64),
                doc_id,
                field: draft.field,
                sequence: draft.sequence,
                terms: draft.terms,
                text: draft.text,
                attributes: BTreeMap::new(),
            })
            .collect();

        let document = Document {
            id: doc_id,
            fields: self.fields,
            metadata: self.metadata,
        };
        (document, frames)
    }
}

/// Splits documents into frames using the schema's analyzers.
pub struct Framer<'a> {
    schema: &'a Schema,
    analyzers: &'a AnalyzerRegistry,
}

impl<'a> Framer<'a> {
    pub fn new(schema: &'a Schema, analyzers: &'a AnalyzerRegistry) -> Self {
        Framer { schema, analyzers }
    }

    /// Validates every value before analysing any, so a failure has no effect.
    /// Fields missing from the schema are ignored.
    pub fn frame_document<I, K, V>(&self, frame_size: usize, fields: I) -> Result<FramedDocument>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut values: BTreeMap<String, FieldValue> = BTreeMap::new();
        for (name, value) in fields {
            let name = name.into();
            if !self.schema.contains(&name) {
                debug!(field = %name, "ignoring field missing from schema");
                continue;
            }
            values.insert(name, value.into());
        }

        for definition in &self.schema.fields {
            if let Some(value) = values.get(&definition.name) {
                definition.field_type.check_value(&definition.name, value)?;
                if definition.field_type.indexed {
                    self.analyzers.get(&definition.field_type.analyzer)?;
                }
            }
        }

        let mut framed = FramedDocument::default();
        for definition in &self.schema.fields {
            let Some(value) = values.get(&definition.name) else {
                continue;
            };
            let field_type = &definition.field_type;

            if field_type.stored {
                framed.fields.insert(definition.name.clone(), value.clone());
            }

            if field_type.is_structured() {
                let analysed = self.structured_values(field_type, value)?;
                if !analysed.is_empty() {
                    framed.metadata.insert(definition.name.clone(), analysed);
                }
            } else if field_type.is_framed() {
                if let FieldValue::Text(text) = value {
                    let tokens = self.analyzers.analyze(&field_type.analyzer, text)?;
                    framed.frames.extend(split_frames(&definition.name, field_type, text, tokens, frame_size));
                }
            }
        }

        Ok(framed)
    }

    fn structured_values(&self, field_type: &FieldType, value: &FieldValue) -> Result<Vec<AttributeValue>> {
        let values = match (&field_type.kind, value) {
            (FieldKind::Numeric, value) => value.as_f64().map(AttributeValue::Float).into_iter().collect(),
            (FieldKind::Id, FieldValue::Integer(id)) => vec![AttributeValue::Text(id.to_string())],
            (FieldKind::Id, FieldValue::Text(id)) => vec![AttributeValue::Text(id.clone())],
            (_, FieldValue::Text(text)) => self
                .analyzers
                .analyze(&field_type.analyzer, text)?
                .into_iter()
                .map(|token| AttributeValue::Text(token.text))
                .collect(),
            _ => Vec::new(),
        };
        Ok(values)
    }
}

/// `frame_size == 0` gives one frame for the whole value, otherwise
/// `ceil(tokens / frame_size)` frames of consecutive tokens.
fn split_frames(field: &str, field_type: &FieldType, text: &str, tokens: Vec<Token>, frame_size: usize) -> Vec<FrameDraft> {
    if frame_size == 0 {
        return vec![FrameDraft {
            field: field.to_string(),
            sequence: 0,
            terms: positioned(&tokens),
            text: field_type.stored.then(|| text.to_string()),
        }];
    }

    tokens
        .chunks(frame_size)
        .enumerate()
        .map(|(sequence, chunk)| {
            let covered = match (chunk.first(), chunk.last()) {
                (Some(first), Some(last)) => text.get(first.offset..last.end()).map(str::to_string),
                _ => None,
            };
            FrameDraft {
                field: field.to_string(),
                sequence: sequence as u32,
                terms: positioned(chunk),
                text: if field_type.stored { covered } else { None },
            }
        })
        .collect()
}

fn positioned(tokens: &[Token]) -> Vec<(String, u32)> {
    tokens
        .iter()
        .enumerate()
        .map(|(position, token)| (token.text.clone(), position as u32))
        .collect()
}
