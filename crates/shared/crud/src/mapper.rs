//! Field-name based object mapping.
//!
//! Both shapes go through their serde representation: properties with the
//! same (serialized) name are copied, unknown ones are ignored. Per-property
//! [`Converter`]s rewrite values on the way.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use common::{json, AppResult, JsonMap};

/// Rewrites one property value during mapping.
pub trait Converter: Send + Sync {
    fn convert(&self, value: Value) -> AppResult<Value>;
}

impl<F> Converter for F
where
    F: Fn(Value) -> AppResult<Value> + Send + Sync,
{
    fn convert(&self, value: Value) -> AppResult<Value> {
        self(value)
    }
}

#[derive(Clone, Default)]
pub struct ModelMapper {
    skipped: BTreeSet<String>,
    converters: BTreeMap<String, Arc<dyn Converter>>,
}

impl std::fmt::Debug for ModelMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelMapper")
            .field("skipped", &self.skipped)
            .field("converters", &self.converters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never copy these properties.
    pub fn skip<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skipped.extend(properties.into_iter().map(Into::into));
        self
    }

    pub fn with_converter(
        mut self,
        property: impl Into<String>,
        converter: impl Converter + 'static,
    ) -> Self {
        self.converters.insert(property.into(), Arc::new(converter));
        self
    }

    /// Apply skips and converters to a serialized source.
    pub fn transform(&self, source: JsonMap) -> AppResult<JsonMap> {
        let mut target = JsonMap::new();
        for (property, value) in source {
            if self.skipped.contains(&property) {
                continue;
            }
            let value = match self.converters.get(&property) {
                Some(converter) if !value.is_null() => converter.convert(value)?,
                _ => value,
            };
            target.insert(property, value);
        }
        Ok(target)
    }

    /// Map into a new instance of `D`.
    pub fn map<S, D>(&self, source: &S) -> AppResult<D>
    where
        S: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        json::from_map(self.transform(json::to_map(source)?)?)
    }

    /// Overlay `source` onto `destination`. Properties the source carries
    /// replace the destination's, nulls included; the rest are kept.
    pub fn map_onto<S, D>(&self, source: &S, destination: &D) -> AppResult<D>
    where
        S: Serialize + ?Sized,
        D: Serialize + DeserializeOwned,
    {
        let mut target = json::to_map(destination)?;
        target.extend(self.transform(json::to_map(source)?)?);
        json::from_map(target)
    }
}

/// Maps every element of an array with a nested mapper.
pub struct CollectionConverter {
    element: ModelMapper,
}

impl CollectionConverter {
    pub fn new(element: ModelMapper) -> Self {
        Self { element }
    }
}

impl Converter for CollectionConverter {
    fn convert(&self, value: Value) -> AppResult<Value> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => self.element.transform(map).map(Value::Object),
                    other => Ok(other),
                })
                .collect::<AppResult<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase", default)]
    struct Lecture {
        id: Option<i64>,
        title: Option<String>,
        room: Option<String>,
        secret: Option<String>,
        tags: Vec<Tag>,
    }

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct Tag {
        label: String,
        internal: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase", default)]
    struct LectureView {
        id: Option<i64>,
        title: Option<String>,
        secret: Option<String>,
        tags: Vec<Tag>,
    }

    fn lecture() -> Lecture {
        Lecture {
            id: Some(1),
            title: Some("Anatomy".to_string()),
            room: Some("B2".to_string()),
            secret: Some("s".to_string()),
            tags: vec![Tag {
                label: "core".to_string(),
                internal: Some("x".to_string()),
            }],
        }
    }

    #[test]
    fn test_map_matches_names_and_skips() {
        let mapper = ModelMapper::new().skip(["secret"]);
        let view: LectureView = mapper.map(&lecture()).unwrap();

        assert_eq!(view.id, Some(1));
        assert_eq!(view.title.as_deref(), Some("Anatomy"));
        assert_eq!(view.secret, None);
    }

    #[test]
    fn test_map_onto_copies_nulls_and_keeps_the_rest() {
        let mapper = ModelMapper::new();
        let source = json!({"title": null, "room": "C1"});
        let merged: Lecture = mapper.map_onto(&source, &lecture()).unwrap();

        assert_eq!(merged.title, None);
        assert_eq!(merged.room.as_deref(), Some("C1"));
        assert_eq!(merged.secret.as_deref(), Some("s"));
    }

    #[test]
    fn test_converters_rewrite_values() {
        let mapper = ModelMapper::new().with_converter("title", |value: Value| -> AppResult<Value> {
            Ok(json!(value.as_str().unwrap_or_default().to_uppercase()))
        });
        let view: LectureView = mapper.map(&lecture()).unwrap();
        assert_eq!(view.title.as_deref(), Some("ANATOMY"));
    }

    #[test]
    fn test_collection_converter_maps_elements() {
        let element = ModelMapper::new().skip(["internal"]);
        let mapper = ModelMapper::new().with_converter("tags", CollectionConverter::new(element));
        let view: LectureView = mapper.map(&lecture()).unwrap();

        assert_eq!(view.tags.len(), 1);
        assert_eq!(view.tags[0].label, "core");
        assert_eq!(view.tags[0].internal, None);
    }
}
