// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Connection bookkeeping
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One connection per distinct topic, created on the first write to that
// topic. Ids are assigned densely in first-seen order starting at 0 and never
// change; connections are never removed or mutated.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::codec::{is_valid_md5sum, MessageCodec};
use crate::error::{BagError, BagResult};
use crate::format::{field, HeaderFields, OpCode};

/// Topic metadata recorded once per topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub id: u32,
    pub topic: String,
    pub datatype: String,
    pub md5sum: String,
    pub definition: String,
    pub caller_id: Option<String>,
    pub latching: bool,
}

impl Connection {
    /// Header of the CONNECTION record.
    pub fn record_header(&self) -> HeaderFields {
        HeaderFields::new()
            .with_u32(field::CONN, self.id)
            .with_op(OpCode::Connection)
            .with_str(field::TOPIC, &self.topic)
    }

    /// Data block of the CONNECTION record: the connection header as the
    /// publisher would have sent it, itself encoded as header fields.
    pub fn record_data(&self) -> HeaderFields {
        let mut fields = HeaderFields::new();
        if let Some(caller_id) = &self.caller_id {
            fields = fields.with_str(field::CALLERID, caller_id);
        }
        fields
            .with_str(field::LATCHING, if self.latching { "1" } else { "0" })
            .with_str(field::MD5SUM, &self.md5sum)
            .with_str(field::MESSAGE_DEFINITION, &self.definition)
            .with_str(field::TOPIC, &self.topic)
            .with_str(field::TYPE, &self.datatype)
    }
}

/// Topic-to-connection registry owned by a single writer.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    by_topic: HashMap<String, u32>,
    connections: Vec<Connection>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the connection for `topic`, creating it from `codec`'s metadata
    /// on first use.
    ///
    /// The returned flag is `true` when the connection was just created; the
    /// caller must then write its CONNECTION record before any message on
    /// the topic. `default_caller_id` is used when the codec reports none.
    ///
    /// Writing a different datatype or digest to an existing topic is an
    /// encoding error.
    pub fn get_or_create<M: MessageCodec + ?Sized>(
        &mut self,
        topic: &str,
        codec: &M,
        default_caller_id: Option<&str>,
    ) -> BagResult<(&Connection, bool)> {
        if let Some(&id) = self.by_topic.get(topic) {
            let existing = &self.connections[id as usize];
            if existing.datatype != codec.datatype() || existing.md5sum != codec.md5sum() {
                return Err(BagError::encoding(
                    topic,
                    format!(
                        "topic already carries {} [{}], cannot write {} [{}]",
                        existing.datatype,
                        existing.md5sum,
                        codec.datatype(),
                        codec.md5sum()
                    ),
                ));
            }
            return Ok((existing, false));
        }

        validate_metadata(topic, codec)?;

        let id = u32::try_from(self.connections.len())
            .map_err(|_| BagError::encoding(topic, "connection id space exhausted"))?;
        let connection = Connection {
            id,
            topic: topic.to_string(),
            datatype: codec.datatype().to_string(),
            md5sum: codec.md5sum().to_string(),
            definition: codec.definition().to_string(),
            caller_id: codec
                .caller_id()
                .or(default_caller_id)
                .map(str::to_string),
            latching: codec.latching(),
        };

        debug!(
            id,
            topic,
            datatype = %connection.datatype,
            "Registered connection"
        );

        self.by_topic.insert(connection.topic.clone(), id);
        self.connections.push(connection);
        Ok((&self.connections[id as usize], true))
    }

    /// Look up a connection by id.
    pub fn get(&self, id: u32) -> Option<&Connection> {
        self.connections.get(id as usize)
    }

    /// Look up a connection by topic.
    pub fn by_topic(&self, topic: &str) -> Option<&Connection> {
        self.by_topic.get(topic).and_then(|&id| self.get(id))
    }

    /// All connections in id order.
    pub fn iter(&self) -> std::slice::Iter<'_, Connection> {
        self.connections.iter()
    }

    pub fn as_slice(&self) -> &[Connection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

fn validate_metadata<M: MessageCodec + ?Sized>(topic: &str, codec: &M) -> BagResult<()> {
    if topic.is_empty() {
        return Err(BagError::encoding(topic, "topic name is empty"));
    }
    if codec.datatype().is_empty() {
        return Err(BagError::encoding(topic, "message datatype is empty"));
    }
    if !is_valid_md5sum(codec.md5sum()) {
        return Err(BagError::encoding(
            topic,
            format!(
                "md5sum '{}' for {} is not 32 hex characters",
                codec.md5sum(),
                codec.datatype()
            ),
        ));
    }
    Ok(())
}
