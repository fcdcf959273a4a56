//! Versioned access records
//!
//! A [`Univalue`] is one transaction's view of one path within a batch: the
//! value (or pending delta) it produced plus a [`Property`] header counting
//! how the path was touched. The counters drive conflict detection; the value
//! drives finalization.
//!
//! # Record Format
//!
//! ```text
//! Univalue:
//! ┌────────────────────┬──────────────────┬────────────────┬─────────────┐
//! │ property_size (4)  │ value_size (4)   │ Property bytes │ Value bytes │
//! └────────────────────┴──────────────────┴────────────────┴─────────────┘
//!
//! Property:
//! ┌────────┬───────────┬────────────┬─────────────────┬──────────┬───────────┬──────────────┬──────┐
//! │ tx (4) │ reads (4) │ writes (4) │ delta_writes (4)│ type (1) │ flags (1) │ path_len (4) │ path │
//! └────────┴───────────┴────────────┴─────────────────┴──────────┴───────────┴──────────────┴──────┘
//! ```
//!
//! A `value_size` of zero means the record carries no value.

use byteorder::{ByteOrder, LittleEndian};

use parastate_core::{AccessCounts, Error, Result, TxId, TypeId, Value};

const FLAG_PREEXISTS: u8 = 0x01;
const FLAG_PERSISTENT: u8 = 0x02;

/// Fixed part of an encoded [`Property`]
pub const PROPERTY_HEADER_SIZE: usize = 22;

/// Size of the `[property_size, value_size]` header
pub const RECORD_HEADER_SIZE: usize = 8;

/// Access metadata of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    tx: TxId,
    path: String,
    type_id: TypeId,
    reads: u32,
    writes: u32,
    delta_writes: u32,
    preexists: bool,
    persistent: bool,
}

impl Property {
    /// Create a new property header
    pub fn new(
        tx: TxId,
        path: impl Into<String>,
        type_id: TypeId,
        reads: u32,
        writes: u32,
        delta_writes: u32,
        preexists: bool,
    ) -> Self {
        Property {
            tx,
            path: path.into(),
            type_id,
            reads,
            writes,
            delta_writes,
            preexists,
            persistent: false,
        }
    }

    /// Originating transaction
    pub fn tx(&self) -> TxId {
        self.tx
    }

    /// Key of the record
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Variant of the value, `Invalid` when absent
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Number of reads
    pub fn reads(&self) -> u32 {
        self.reads
    }

    /// Number of full writes
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Number of delta writes
    pub fn delta_writes(&self) -> u32 {
        self.delta_writes
    }

    /// Whether the path had a value before the batch
    pub fn preexists(&self) -> bool {
        self.preexists
    }

    /// Whether the record survives conflict-driven rollback
    pub fn persistent(&self) -> bool {
        self.persistent
    }

    /// Total accesses of any kind
    pub fn total_accesses(&self) -> u64 {
        self.reads as u64 + self.writes as u64 + self.delta_writes as u64
    }

    fn record(&mut self, counts: AccessCounts) {
        self.reads = self.reads.saturating_add(counts.reads);
        self.writes = self.writes.saturating_add(counts.writes);
        self.delta_writes = self.delta_writes.saturating_add(counts.delta_writes);
    }

    /// Size of the encoded property
    pub fn encoded_size(&self) -> usize {
        PROPERTY_HEADER_SIZE + self.path.len()
    }

    /// Append the encoded property to `bytes`
    pub fn encode_into(&self, bytes: &mut Vec<u8>) {
        let start = bytes.len();
        bytes.resize(start + PROPERTY_HEADER_SIZE, 0);
        let header = &mut bytes[start..];
        LittleEndian::write_u32(&mut header[0..4], self.tx);
        LittleEndian::write_u32(&mut header[4..8], self.reads);
        LittleEndian::write_u32(&mut header[8..12], self.writes);
        LittleEndian::write_u32(&mut header[12..16], self.delta_writes);
        header[16] = self.type_id.as_u8();
        let mut flags = 0u8;
        if self.preexists {
            flags |= FLAG_PREEXISTS;
        }
        if self.persistent {
            flags |= FLAG_PERSISTENT;
        }
        header[17] = flags;
        LittleEndian::write_u32(&mut header[18..22], self.path.len() as u32);
        bytes.extend_from_slice(self.path.as_bytes());
    }

    /// Decode a property from exactly `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PROPERTY_HEADER_SIZE {
            return Err(Error::codec("property header truncated"));
        }
        let type_id = TypeId::from_u8(bytes[16])
            .ok_or_else(|| Error::codec(format!("unknown type tag {:#04x}", bytes[16])))?;
        let flags = bytes[17];
        let path_len = LittleEndian::read_u32(&bytes[18..22]) as usize;
        if bytes.len() != PROPERTY_HEADER_SIZE + path_len {
            return Err(Error::codec(format!(
                "property length mismatch: header says {} path bytes, found {}",
                path_len,
                bytes.len() - PROPERTY_HEADER_SIZE
            )));
        }
        let path = std::str::from_utf8(&bytes[PROPERTY_HEADER_SIZE..])
            .map_err(|_| Error::codec("path is not valid UTF-8"))?;
        Ok(Property {
            tx: LittleEndian::read_u32(&bytes[0..4]),
            path: path.to_string(),
            type_id,
            reads: LittleEndian::read_u32(&bytes[4..8]),
            writes: LittleEndian::read_u32(&bytes[8..12]),
            delta_writes: LittleEndian::read_u32(&bytes[12..16]),
            preexists: flags & FLAG_PREEXISTS != 0,
            persistent: flags & FLAG_PERSISTENT != 0,
        })
    }
}

/// One transaction's access record for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Univalue {
    property: Property,
    value: Option<Value>,
}

impl Univalue {
    /// Create a record with explicit counters
    pub fn new(
        tx: TxId,
        path: impl Into<String>,
        reads: u32,
        writes: u32,
        delta_writes: u32,
        value: Option<Value>,
        preexists: bool,
    ) -> Self {
        let type_id = value.as_ref().map_or(TypeId::Invalid, Value::type_id);
        Univalue {
            property: Property::new(tx, path, type_id, reads, writes, delta_writes, preexists),
            value,
        }
    }

    /// Assemble a record from its parts
    pub fn from_parts(property: Property, value: Option<Value>) -> Self {
        Univalue { property, value }
    }

    /// Access metadata
    pub fn property(&self) -> &Property {
        &self.property
    }

    /// Originating transaction
    pub fn tx(&self) -> TxId {
        self.property.tx
    }

    /// Key of the record; empty once voided
    pub fn path(&self) -> &str {
        &self.property.path
    }

    /// Variant of the value
    pub fn type_id(&self) -> TypeId {
        self.property.type_id
    }

    /// Number of reads
    pub fn reads(&self) -> u32 {
        self.property.reads
    }

    /// Number of full writes
    pub fn writes(&self) -> u32 {
        self.property.writes
    }

    /// Number of delta writes
    pub fn delta_writes(&self) -> u32 {
        self.property.delta_writes
    }

    /// Whether the path had a value before the batch
    pub fn preexists(&self) -> bool {
        self.property.preexists
    }

    /// Whether the record survives conflict-driven rollback
    pub fn persistent(&self) -> bool {
        self.property.persistent
    }

    /// Mark the record as exempt from rollback
    pub fn set_persistent(&mut self, persistent: bool) {
        self.property.persistent = persistent;
    }

    /// Value without touching the counters
    pub fn peek(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Take ownership of the value
    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// Read the value, counting one read
    pub fn get(&mut self) -> Option<&Value> {
        self.property.record(AccessCounts::read());
        self.value.as_ref()
    }

    /// No write or delta write recorded
    pub fn is_read_only(&self) -> bool {
        self.property.writes == 0 && self.property.delta_writes == 0
    }

    /// Only delta writes recorded
    pub fn is_delta_write_only(&self) -> bool {
        self.property.reads == 0 && self.property.writes == 0 && self.property.delta_writes > 0
    }

    /// Whether the record was voided by a whitelist pass
    pub fn is_void(&self) -> bool {
        self.property.path.is_empty()
    }

    /// Void the record so that finalization skips it
    pub fn invalidate(&mut self) {
        self.property.path.clear();
    }

    /// Drop the payload but keep the access metadata
    pub fn strip_value(&mut self) {
        self.value = None;
    }

    /// Apply a write to this record.
    ///
    /// `None` deletes the value. A first value is adopted as is; a delta on an
    /// existing commutative value accumulates; anything else replaces it.
    ///
    /// # Errors
    ///
    /// - `ValueNotFound` when deleting a value that does not exist. The
    ///   attempt is still counted as a write.
    /// - `TypeMismatch`, `Overflow`, `Underflow` from the value's own `set`.
    pub fn set(&mut self, new_value: Option<Value>) -> Result<()> {
        match (self.value.as_mut(), new_value) {
            (None, None) => {
                self.property.record(AccessCounts::write());
                Err(Error::ValueNotFound(self.property.path.clone()))
            }
            (None, Some(value)) => {
                let counts = if value.is_delta() {
                    AccessCounts::delta_write()
                } else {
                    AccessCounts::write()
                };
                self.property.type_id = value.type_id();
                self.value = Some(value);
                self.property.record(counts);
                Ok(())
            }
            (Some(_), None) => {
                self.property.type_id = TypeId::Invalid;
                self.value = None;
                self.property.record(AccessCounts::write());
                Ok(())
            }
            (Some(current), Some(value)) => {
                let counts = current.set(value)?;
                self.property.type_id = current.type_id();
                self.property.record(counts);
                Ok(())
            }
        }
    }

    /// Merge a chain of later records for the same path into this one.
    ///
    /// Counters of the chain are summed into this record. Elements with a full
    /// write replace the value; delta-only elements contribute their pending
    /// delta; a write without a value deletes. When this record holds only a
    /// pending delta, the chain folds onto zero.
    ///
    /// # Errors
    ///
    /// - `Invariant` if the chain violates the merge preconditions. These
    ///   must abort the batch.
    /// - Recoverable value errors (`Overflow`, `Underflow`, `TypeMismatch`)
    ///   propagated untouched.
    pub fn apply_delta(&mut self, chain: &[Univalue]) -> Result<()> {
        self.precheck(chain)?;

        for elem in chain {
            self.property.record(AccessCounts {
                reads: elem.reads(),
                writes: elem.writes(),
                delta_writes: elem.delta_writes(),
            });
        }

        if self.value.is_none() && chain.iter().all(|e| e.writes() == 0) {
            return Ok(());
        }

        let mut pending: Vec<&Value> = Vec::new();
        for elem in chain {
            if elem.writes() == 0 {
                if let Some(delta) = elem.value.as_ref() {
                    pending.push(delta);
                }
                continue;
            }
            self.fold(&mut pending)?;
            self.value = elem.value.clone();
        }
        self.fold(&mut pending)?;
        self.resolve()
    }

    /// Fold the pending delta into the value.
    ///
    /// A pure delta on a key with no committed value resolves against zero.
    ///
    /// # Errors
    ///
    /// `Overflow` or `Underflow` if the resolved value leaves its bounds; the
    /// record is unchanged in that case.
    pub fn resolve(&mut self) -> Result<()> {
        if let Some(value) = self.value.as_mut() {
            value.apply_delta(&[]).map_err(|e| e.source)?;
        }
        self.property.type_id = self.value.as_ref().map_or(TypeId::Invalid, Value::type_id);
        Ok(())
    }

    fn fold(&mut self, pending: &mut Vec<&Value>) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }
        if let Some(value) = self.value.as_mut() {
            value.apply_delta(pending).map_err(|e| e.source)?;
        }
        pending.clear();
        Ok(())
    }

    fn precheck(&self, chain: &[Univalue]) -> Result<()> {
        for elem in chain {
            if elem.property.total_accesses() == 0 {
                return Err(Error::invariant(format!(
                    "untouched record from tx {} in merge chain of {}",
                    elem.tx(),
                    self.path()
                )));
            }
            if elem.is_read_only() {
                return Err(Error::invariant(format!(
                    "read-only record from tx {} in merge chain of {}",
                    elem.tx(),
                    self.path()
                )));
            }
            if self.preexists() && self.reads() > 0 {
                if let (Some(base), Some(value)) = (self.value.as_ref(), elem.value.as_ref()) {
                    if base.is_commutative() && base.type_id() != value.type_id() {
                        return Err(Error::invariant(format!(
                            "{} record from tx {} merged into {} base at {}",
                            value.type_name(),
                            elem.tx(),
                            base.type_name(),
                            self.path()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Encode the property and value separately
    pub fn encode_parts(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut property = Vec::with_capacity(self.property.encoded_size());
        self.property.encode_into(&mut property);
        let value = match &self.value {
            Some(v) => v.encode()?,
            None => Vec::new(),
        };
        Ok((property, value))
    }

    /// Encode as a length-prefixed two-field record
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (property, value) = self.encode_parts()?;
        let mut bytes = vec![0u8; RECORD_HEADER_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], property.len() as u32);
        LittleEndian::write_u32(&mut bytes[4..8], value.len() as u32);
        bytes.extend_from_slice(&property);
        bytes.extend_from_slice(&value);
        Ok(bytes)
    }

    /// Decode one record from the start of `bytes`.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(Error::codec("record header truncated"));
        }
        let property_size = LittleEndian::read_u32(&bytes[0..4]) as usize;
        let value_size = LittleEndian::read_u32(&bytes[4..8]) as usize;
        let end = RECORD_HEADER_SIZE + property_size + value_size;
        if bytes.len() < end {
            return Err(Error::codec("record body truncated"));
        }
        let property = Property::decode(&bytes[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + property_size])?;
        let value = if value_size == 0 {
            None
        } else {
            Some(Value::decode(
                property.path(),
                &bytes[RECORD_HEADER_SIZE + property_size..end],
            )?)
        };
        Ok((Univalue { property, value }, end))
    }
}
