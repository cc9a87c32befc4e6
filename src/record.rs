use crate::error::{DecodeError, MappingError, RedmapError};
use crate::value::{render, FromFieldValue, ToFieldValue};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A write-side hash record: the ordered field and value pairs sent by
/// [`Client::set_record`](crate::Client::set_record) in one command.
///
/// Values are rendered to their wire form as they are added, so a record
/// can be built once and written many times.
///
/// ```rust
/// let record = redmap::Record::new()
///     .field("title", "The WAN Show")
///     .field("membership_fee", 9.99);
/// assert_eq!(record.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Record {
    fields: Vec<(String, Vec<u8>)>,
}

impl Record {
    pub fn new() -> Record {
        return Record::default();
    }

    /// Appends a field. A name used twice is sent twice and the server
    /// keeps the later value.
    ///
    /// # Panics
    ///
    /// Panics if the value's [`ToFieldValue`] implementation reports an
    /// error; the implementations provided by this crate never do.
    pub fn field<N: Into<String>, V: ToFieldValue<Vec<u8>>>(mut self, name: N, value: V) -> Record {
        let rendered = render(&value);
        self.fields.push((name.into(), rendered));
        self
    }

    pub fn len(&self) -> usize {
        return self.fields.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.fields.is_empty();
    }

    pub(crate) fn pairs(&self) -> &[(String, Vec<u8>)] {
        &self.fields
    }
}

struct MappedField<S> {
    name: String,
    assign: Box<dyn Fn(&mut S, Vec<u8>) -> Result<(), RedmapError> + Send + Sync>,
}

/// Describes how a raw hash record decodes into a caller struct `S`.
///
/// Each entry pairs a wire field name with the scalar type it decodes as
/// and the closure that stores it, so a mapping that names a struct field
/// which does not exist will not compile. Misconfiguration the compiler
/// cannot see, an empty mapping or a wire field declared twice, is
/// rejected by [`RecordMappingBuilder::build`] with a
/// [`MappingError`](crate::MappingError).
///
/// A mapping holds no state from any particular read; build it once and
/// share it across calls and threads.
///
/// ```rust
/// #[derive(Default)]
/// struct Podcast {
///     title: String,
///     membership_fee: f64,
/// }
///
/// let mapping = redmap::RecordMapping::<Podcast>::builder()
///     .field("title", |p: &mut Podcast, v: String| p.title = v)
///     .field("membership_fee", |p: &mut Podcast, v: f64| p.membership_fee = v)
///     .build()
///     .unwrap();
/// ```
pub struct RecordMapping<S> {
    fields: Vec<MappedField<S>>,
}

impl<S> RecordMapping<S> {
    pub fn builder() -> RecordMappingBuilder<S> {
        return RecordMappingBuilder { fields: Vec::new() };
    }

    /// Decodes `raw` into `target`, consuming the declared fields.
    ///
    /// Fields present on the wire but not declared are left in `raw` and
    /// ignored; a declared field absent from the wire is a
    /// [`DecodeError::MissingField`].
    pub(crate) fn apply(
        &self,
        raw: &mut HashMap<String, Vec<u8>>,
        target: &mut S,
    ) -> Result<(), RedmapError> {
        for field in &self.fields {
            let value = match raw.remove(&field.name) {
                Some(value) => value,
                None => return Err(DecodeError::MissingField(field.name.clone()))?,
            };
            (field.assign)(target, value)?;
        }
        Ok(())
    }
}

impl<S> fmt::Debug for RecordMapping<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|field| field.name.as_str()).collect();
        f.debug_struct("RecordMapping").field("fields", &names).finish()
    }
}

/// Builder for a [`RecordMapping`], returned by [`RecordMapping::builder`].
pub struct RecordMappingBuilder<S> {
    fields: Vec<MappedField<S>>,
}

impl<S> RecordMappingBuilder<S> {
    /// Declares that the wire field `name` decodes as `V` and is stored
    /// into the struct by `assign`.
    pub fn field<V, F>(mut self, name: impl Into<String>, assign: F) -> Self
    where
        V: FromFieldValue,
        F: Fn(&mut S, V) + Send + Sync + 'static,
    {
        self.fields.push(MappedField {
            name: name.into(),
            assign: Box::new(move |target, raw| {
                let value = V::from_field_value(raw)?;
                assign(target, value);
                Ok(())
            }),
        });
        self
    }

    pub fn build(self) -> Result<RecordMapping<S>, RedmapError> {
        if self.fields.is_empty() {
            return Err(MappingError::EmptyMapping)?;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(MappingError::DuplicateField(field.name.clone()))?;
            }
        }
        Ok(RecordMapping { fields: self.fields })
    }
}
