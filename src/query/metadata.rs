use std::cmp::Ordering;
use std::collections::BTreeSet;
use roaring::RoaringTreemap;
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{AttributeValue, DocId, FieldValue};
use crate::mvcc::snapshot::IndexSnapshot;
use crate::schema::schema::{FieldKind, FieldType};

/// Comparison applied to the values of one structured field or frame attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Eq(FieldValue),
    Lt(FieldValue),
    Le(FieldValue),
    Gt(FieldValue),
    Ge(FieldValue),
    In(Vec<FieldValue>),
    /// Inclusive on both ends.
    Between(FieldValue, FieldValue),
    NotBetween(FieldValue, FieldValue),
}

impl Comparison {
    pub fn operator(&self) -> &'static str {
        match self {
            Comparison::Eq(_) => "=",
            Comparison::Lt(_) => "<",
            Comparison::Le(_) => "<=",
            Comparison::Gt(_) => ">",
            Comparison::Ge(_) => ">=",
            Comparison::In(_) => "in",
            Comparison::Between(..) => "between",
            Comparison::NotBetween(..) => "not between",
        }
    }

    fn is_range(&self) -> bool {
        !matches!(self, Comparison::Eq(_) | Comparison::In(_))
    }

    fn unsupported(&self, target: &str) -> Error {
        Error::new(
            ErrorKind::UnsupportedOperator,
            format!("operator '{}' is not supported on {}", self.operator(), target),
        )
    }

    /// Predicate over stored attribute values; only `=, <, <=, >, >=` apply.
    pub(crate) fn attribute_predicate(&self) -> Result<impl Fn(&AttributeValue) -> bool + use<>> {
        let (target, accept): (AttributeValue, fn(Ordering) -> bool) = match self {
            Comparison::Eq(value) => (value.clone().into(), Ordering::is_eq),
            Comparison::Lt(value) => (value.clone().into(), Ordering::is_lt),
            Comparison::Le(value) => (value.clone().into(), Ordering::is_le),
            Comparison::Gt(value) => (value.clone().into(), Ordering::is_gt),
            Comparison::Ge(value) => (value.clone().into(), Ordering::is_ge),
            other => return Err(other.unsupported("frame attributes")),
        };
        Ok(move |value: &AttributeValue| compare(value, &target).is_some_and(accept))
    }
}

/// Numbers compare across integer and float; other values only with their own kind.
fn compare(value: &AttributeValue, target: &AttributeValue) -> Option<Ordering> {
    match (value.as_f64(), target.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        (None, None) if std::mem::discriminant(value) == std::mem::discriminant(target) => Some(value.cmp(target)),
        _ => None,
    }
}

fn numeric(field: &str, value: &FieldValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        Error::new(
            ErrorKind::Type,
            format!("numeric field '{}' cannot be compared with a {} value", field, value.type_name()),
        )
    })
}

impl IndexSnapshot {
    /// Live documents whose structured fields satisfy every condition.
    ///
    /// Query values are analysed the way values of the field are at ingest.
    /// Documents without a value for a queried field never match it.
    pub fn filter(&self, conditions: &[(&str, Comparison)], analyzers: &AnalyzerRegistry) -> Result<BTreeSet<DocId>> {
        let mut matched: Option<RoaringTreemap> = None;

        for (field, comparison) in conditions {
            let field_type = self
                .schema()
                .get(field)
                .ok_or_else(|| Error::new(ErrorKind::UnknownField, format!("no field '{}' in schema", field)))?;
            if !field_type.is_structured() {
                return Err(Error::new(
                    ErrorKind::NonIndexedField,
                    format!("field '{}' holds no indexed metadata", field),
                ));
            }
            if comparison.is_range() && field_type.kind != FieldKind::Numeric {
                return Err(comparison.unsupported(&format!("non-numeric field '{}'", field)));
            }

            let ids = self.match_field(field, field_type, comparison, analyzers)?;
            matched = Some(match matched {
                Some(current) => current & ids,
                None => ids,
            });
        }

        let result = match matched {
            Some(ids) => ids.iter().map(DocId).collect(),
            None => self.documents.keys().copied().collect(),
        };
        Ok(result)
    }

    fn match_field(
        &self,
        field: &str,
        field_type: &FieldType,
        comparison: &Comparison,
        analyzers: &AnalyzerRegistry,
    ) -> Result<RoaringTreemap> {
        if field_type.kind == FieldKind::Numeric {
            let ids = match comparison {
                Comparison::Eq(v) => {
                    let v = numeric(field, v)?;
                    self.metadata.matching(field, |x| x.as_f64() == Some(v))
                }
                Comparison::Lt(v) => {
                    let v = numeric(field, v)?;
                    self.metadata.matching(field, |x| x.as_f64().is_some_and(|x| x < v))
                }
                Comparison::Le(v) => {
                    let v = numeric(field, v)?;
                    self.metadata.matching(field, |x| x.as_f64().is_some_and(|x| x <= v))
                }
                Comparison::Gt(v) => {
                    let v = numeric(field, v)?;
                    self.metadata.matching(field, |x| x.as_f64().is_some_and(|x| x > v))
                }
                Comparison::Ge(v) => {
                    let v = numeric(field, v)?;
                    self.metadata.matching(field, |x| x.as_f64().is_some_and(|x| x >= v))
                }
                Comparison::In(values) => {
                    let values = values.iter().map(|v| numeric(field, v)).collect::<Result<Vec<_>>>()?;
                    self.metadata
                        .matching(field, |x| x.as_f64().is_some_and(|x| values.contains(&x)))
                }
                Comparison::Between(low, high) => {
                    let (low, high) = (numeric(field, low)?, numeric(field, high)?);
                    self.metadata
                        .matching(field, |x| x.as_f64().is_some_and(|x| low <= x && x <= high))
                }
                Comparison::NotBetween(low, high) => {
                    let (low, high) = (numeric(field, low)?, numeric(field, high)?);
                    self.metadata
                        .matching(field, |x| x.as_f64().is_some_and(|x| x < low || x > high))
                }
            };
            return Ok(ids);
        }

        let wanted: BTreeSet<AttributeValue> = match comparison {
            Comparison::Eq(value) => self.analyse_value(field_type, value, analyzers)?,
            Comparison::In(values) => {
                let mut wanted = BTreeSet::new();
                for value in values {
                    wanted.extend(self.analyse_value(field_type, value, analyzers)?);
                }
                wanted
            }
            other => return Err(other.unsupported(&format!("non-numeric field '{}'", field))),
        };
        Ok(self.metadata.matching(field, |x| wanted.contains(x)))
    }

    fn analyse_value(
        &self,
        field_type: &FieldType,
        value: &FieldValue,
        analyzers: &AnalyzerRegistry,
    ) -> Result<BTreeSet<AttributeValue>> {
        let values = match (&field_type.kind, value) {
            (FieldKind::Id, FieldValue::Integer(id)) => [AttributeValue::Text(id.to_string())].into(),
            (FieldKind::Id, FieldValue::Text(id)) => [AttributeValue::Text(id.clone())].into(),
            (_, FieldValue::Text(text)) => analyzers
                .analyze(&field_type.analyzer, text)?
                .into_iter()
                .map(|token| AttributeValue::Text(token.text))
                .collect(),
            (_, other) => [AttributeValue::from(other.clone())].into(),
        };
        Ok(values)
    }
}
