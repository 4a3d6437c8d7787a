//! Entries: one named record inside a bag
//!
//! An [`Entry`] is a transient value built per write or per read. Its payload
//! is an [`Envelope`]; time-series entries carry a [`StampedMessage`] wrapper
//! as their payload and describe the wrapped value in their [`Context`].

use crate::error::{BagError, BagResult};
use crate::naming::topic_from_entryname;
use crate::proto::{type_url_for, Envelope, StampedMessage, TopicTime, STAMPED_MESSAGE_TYPE_URL};
use crate::time::Timestamp;
use prost::{Message, Name};
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use std::fmt;

/// Topic, time and type information attached to an entry
#[derive(Clone, Default)]
pub struct Context {
    /// Topic the entry belongs to; empty for non-time-series entries
    pub topic: String,
    /// Time of the entry; required whenever `topic` is non-empty
    pub timestamp: Option<Timestamp>,
    /// Type URL of the value carried inside a stamped wrapper
    pub inner_type_url: String,
    /// Schema of the value, used only while writing to build the schema index
    pub descriptor: Option<MessageDescriptor>,
}

impl Context {
    fn descriptor_name(&self) -> Option<&str> {
        self.descriptor.as_ref().map(|d| d.full_name())
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic
            && self.timestamp == other.timestamp
            && self.inner_type_url == other.inner_type_url
            && self.descriptor_name() == other.descriptor_name()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("topic", &self.topic)
            .field("timestamp", &self.timestamp)
            .field("inner_type_url", &self.inner_type_url)
            .field("descriptor", &self.descriptor_name())
            .finish()
    }
}

/// A single record in a bag
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// Archive path of the record; empty on write to request a derived name
    pub entryname: String,
    /// Type-tagged payload
    pub payload: Envelope,
    /// Optional topic/time/type metadata
    pub context: Option<Context>,
}

impl Entry {
    /// A typed entry whose schema is known, so it can be indexed
    pub fn from_message<M: ReflectMessage>(entryname: impl Into<String>, msg: &M) -> Self {
        let descriptor = msg.descriptor();
        let type_url = type_url_for(descriptor.full_name());
        Entry {
            entryname: entryname.into(),
            payload: Envelope::new(type_url.clone(), msg.encode_to_vec()),
            context: Some(Context {
                inner_type_url: type_url,
                descriptor: Some(descriptor),
                ..Default::default()
            }),
        }
    }

    /// A time-series entry; the writer derives its name from topic and time
    pub fn stamped<M: ReflectMessage>(
        topic: impl Into<String>,
        timestamp: Timestamp,
        msg: &M,
    ) -> Self {
        let descriptor = msg.descriptor();
        let inner = Envelope::new(type_url_for(descriptor.full_name()), msg.encode_to_vec());
        Self::stamped_envelope(topic.into(), timestamp, inner, Some(descriptor))
    }

    /// A typed entry for a message with a static name but no descriptor
    pub fn from_named<M: Message + Name>(entryname: impl Into<String>, msg: &M) -> Self {
        Entry {
            entryname: entryname.into(),
            payload: Envelope::pack(msg),
            context: None,
        }
    }

    /// A time-series entry for a message with a static name but no descriptor
    pub fn stamped_named<M: Message + Name>(
        topic: impl Into<String>,
        timestamp: Timestamp,
        msg: &M,
    ) -> Self {
        Self::stamped_envelope(topic.into(), timestamp, Envelope::pack(msg), None)
    }

    /// A typed entry from a caller-supplied type URL and bytes, trusted as-is
    pub fn unchecked(entryname: impl Into<String>, type_url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Entry {
            entryname: entryname.into(),
            payload: Envelope::new(type_url, bytes),
            context: None,
        }
    }

    /// A time-series entry from a caller-supplied type URL and bytes
    pub fn stamped_unchecked(
        topic: impl Into<String>,
        timestamp: Timestamp,
        type_url: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self::stamped_envelope(topic.into(), timestamp, Envelope::new(type_url, bytes), None)
    }

    /// An untyped entry; never decoded or indexed
    pub fn raw(entryname: impl Into<String>, bytes: Vec<u8>) -> Self {
        Entry {
            entryname: entryname.into(),
            payload: Envelope::new(String::new(), bytes),
            context: None,
        }
    }

    fn stamped_envelope(
        topic: String,
        timestamp: Timestamp,
        inner: Envelope,
        descriptor: Option<MessageDescriptor>,
    ) -> Self {
        let inner_type_url = inner.type_url.clone();
        let wrapper = StampedMessage {
            timestamp: Some(timestamp),
            msg: Some(inner),
        };
        Entry {
            entryname: String::new(),
            payload: Envelope::new(STAMPED_MESSAGE_TYPE_URL, wrapper.encode_to_vec()),
            context: Some(Context {
                topic,
                timestamp: Some(timestamp),
                inner_type_url,
                descriptor,
            }),
        }
    }

    /// Attach a schema so that an unchecked entry can still be schema-indexed
    pub fn with_descriptor(mut self, descriptor: MessageDescriptor) -> Self {
        let type_url = self.payload.type_url.clone();
        let ctx = self.context.get_or_insert_with(|| Context {
            inner_type_url: type_url,
            ..Default::default()
        });
        ctx.descriptor = Some(descriptor);
        self
    }

    /// Type URL of the payload
    pub fn type_url(&self) -> &str {
        &self.payload.type_url
    }

    /// True if the payload carries no type URL
    pub fn is_raw(&self) -> bool {
        self.payload.is_raw()
    }

    /// True if the payload is a stamped wrapper
    pub fn is_stamped(&self) -> bool {
        self.payload.type_url == STAMPED_MESSAGE_TYPE_URL
    }

    /// Topic, or `""` when there is no context
    pub fn topic(&self) -> &str {
        self.context.as_ref().map_or("", |c| c.topic.as_str())
    }

    /// Timestamp, if any
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.context.as_ref().and_then(|c| c.timestamp)
    }

    /// Index row for this entry; `None` unless both topic and timestamp are set
    pub fn topic_time(&self) -> Option<TopicTime> {
        let ctx = self.context.as_ref()?;
        if ctx.topic.is_empty() {
            return None;
        }
        let timestamp = ctx.timestamp?;
        Some(TopicTime::new(ctx.topic.clone(), timestamp, self.entryname.clone()))
    }

    /// Decode the payload as `M`, checking the type URL first
    pub fn decode_as<M: Message + Name + Default>(&self) -> BagResult<M> {
        if self.is_raw() {
            return Err(BagError::decode(
                &self.entryname,
                "entry is raw; use decode_unchecked",
            ));
        }
        let expected = M::type_url();
        if self.payload.type_url != expected {
            return Err(BagError::decode(
                &self.entryname,
                format!(
                    "type mismatch: entry has {}, requested {}",
                    self.payload.type_url, expected
                ),
            ));
        }
        self.decode_unchecked()
    }

    /// Decode the payload as `M` without looking at the type URL
    pub fn decode_unchecked<M: Message + Default>(&self) -> BagResult<M> {
        M::decode(self.payload.value.as_slice()).map_err(|e| BagError::decode(&self.entryname, e))
    }

    /// Decode the payload against a runtime schema
    pub fn decode_dynamic(&self, descriptor: &MessageDescriptor) -> BagResult<DynamicMessage> {
        let expected = type_url_for(descriptor.full_name());
        if self.payload.type_url != expected {
            return Err(BagError::decode(
                &self.entryname,
                format!(
                    "type mismatch: entry has {}, requested {}",
                    self.payload.type_url, expected
                ),
            ));
        }
        DynamicMessage::decode(descriptor.clone(), self.payload.value.as_slice())
            .map_err(|e| BagError::decode(&self.entryname, e))
    }

    /// Replace a stamped wrapper by the value it carries
    ///
    /// The topic of the returned entry is the parent path of its name; readers
    /// that know better (from an index) overwrite it.
    pub fn unpack_stamped(&self) -> BagResult<Entry> {
        if !self.is_stamped() {
            return Err(BagError::decode(
                &self.entryname,
                format!("not a stamped message: {}", self.payload.type_url),
            ));
        }
        let wrapper = StampedMessage::decode(self.payload.value.as_slice())
            .map_err(|e| BagError::decode(&self.entryname, e))?;
        let inner = wrapper
            .msg
            .ok_or_else(|| BagError::decode(&self.entryname, "stamped message has no payload"))?;
        Ok(Entry {
            entryname: self.entryname.clone(),
            context: Some(Context {
                topic: topic_from_entryname(&self.entryname),
                timestamp: wrapper.timestamp,
                inner_type_url: inner.type_url.clone(),
                descriptor: None,
            }),
            payload: inner,
        })
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_url = if self.is_raw() { "<raw>" } else { self.type_url() };
        write!(
            f,
            "Entry {} [{}] {} bytes",
            self.entryname,
            type_url,
            self.payload.value.len()
        )?;
        if let Some(tt) = self.topic_time() {
            write!(f, " topic={} t={}", tt.topic, tt.timestamp)?;
        }
        Ok(())
    }
}
