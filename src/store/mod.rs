//! Growable store of fixed-size rows
//!
//! Rows are packed back to back in one byte buffer, each row made of
//! [`SLOT_WIDTH`]-byte slots. Rows in `[dead, count)` are live; rows below
//! `dead` were logically removed from the front and are reclaimed the next time
//! the buffer is full, either by compacting in place or while doubling.

use crate::error::{EngineError, Result};
use crate::types::DEFAULT_INITIAL_ROWS;
use tracing::debug;

/// Every stored field occupies one slot of this many bytes
pub const SLOT_WIDTH: usize = 8;

/// Declared type of a caller-supplied trailing column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Timestamp,
    Text,
    Bytea,
    Array,
}

impl ColumnType {
    /// Storage width in bytes, `None` for variable-length types
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ColumnType::Bool => Some(1),
            ColumnType::Int32 | ColumnType::Float32 => Some(4),
            ColumnType::Int64 | ColumnType::Float64 | ColumnType::Timestamp => Some(8),
            ColumnType::Text | ColumnType::Bytea | ColumnType::Array => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int32 => "int4",
            ColumnType::Int64 => "int8",
            ColumnType::Float32 => "float4",
            ColumnType::Float64 => "float8",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Text => "text",
            ColumnType::Bytea => "bytea",
            ColumnType::Array => "array",
        }
    }
}

/// Reject any column that cannot be copied into a slot verbatim
pub fn check_fixed_width(columns: &[ColumnType]) -> Result<()> {
    for (column, ty) in columns.iter().enumerate() {
        match ty.fixed_width() {
            Some(width) if width <= SLOT_WIDTH => {}
            _ => {
                return Err(EngineError::TypeConstraint {
                    column,
                    type_name: ty.name().to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Copy semantics of a value that fits in one slot
pub trait SlotCodec: Sized {
    fn to_slot(&self) -> [u8; SLOT_WIDTH];
    fn from_slot(slot: [u8; SLOT_WIDTH]) -> Self;
}

impl SlotCodec for bool {
    fn to_slot(&self) -> [u8; SLOT_WIDTH] {
        (*self as u64).to_le_bytes()
    }

    fn from_slot(slot: [u8; SLOT_WIDTH]) -> Self {
        u64::from_le_bytes(slot) != 0
    }
}

impl SlotCodec for i64 {
    fn to_slot(&self) -> [u8; SLOT_WIDTH] {
        self.to_le_bytes()
    }

    fn from_slot(slot: [u8; SLOT_WIDTH]) -> Self {
        i64::from_le_bytes(slot)
    }
}

impl SlotCodec for i32 {
    fn to_slot(&self) -> [u8; SLOT_WIDTH] {
        (*self as i64).to_le_bytes()
    }

    fn from_slot(slot: [u8; SLOT_WIDTH]) -> Self {
        i64::from_le_bytes(slot) as i32
    }
}

impl SlotCodec for f64 {
    fn to_slot(&self) -> [u8; SLOT_WIDTH] {
        self.to_le_bytes()
    }

    fn from_slot(slot: [u8; SLOT_WIDTH]) -> Self {
        f64::from_le_bytes(slot)
    }
}

impl SlotCodec for f32 {
    fn to_slot(&self) -> [u8; SLOT_WIDTH] {
        (*self as f64).to_le_bytes()
    }

    fn from_slot(slot: [u8; SLOT_WIDTH]) -> Self {
        f64::from_le_bytes(slot) as f32
    }
}

/// A dynamically typed trailing column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Timestamp(i64),
    Text(String),
    Bytea(Vec<u8>),
}

impl FieldValue {
    /// Whether this value may be stored in a column of type `ty`
    pub fn matches(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (FieldValue::Null, _)
                | (FieldValue::Bool(_), ColumnType::Bool)
                | (FieldValue::Int32(_), ColumnType::Int32)
                | (FieldValue::Int64(_), ColumnType::Int64)
                | (FieldValue::Float32(_), ColumnType::Float32)
                | (FieldValue::Float64(_), ColumnType::Float64)
                | (FieldValue::Timestamp(_), ColumnType::Timestamp)
                | (FieldValue::Text(_), ColumnType::Text)
                | (FieldValue::Bytea(_), ColumnType::Bytea)
        )
    }

    /// Encode into a slot; nulls become a zeroed slot
    pub fn to_slot(&self, column: usize) -> Result<[u8; SLOT_WIDTH]> {
        Ok(match self {
            FieldValue::Null => [0; SLOT_WIDTH],
            FieldValue::Bool(v) => v.to_slot(),
            FieldValue::Int32(v) => v.to_slot(),
            FieldValue::Int64(v) | FieldValue::Timestamp(v) => v.to_slot(),
            FieldValue::Float32(v) => v.to_slot(),
            FieldValue::Float64(v) => v.to_slot(),
            FieldValue::Text(_) => {
                return Err(EngineError::TypeConstraint {
                    column,
                    type_name: "text".to_string(),
                })
            }
            FieldValue::Bytea(_) => {
                return Err(EngineError::TypeConstraint {
                    column,
                    type_name: "bytea".to_string(),
                })
            }
        })
    }
}

/// Borrowed view over one packed row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    bytes: &'a [u8],
}

impl<'a> RowRef<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn slots(&self) -> usize {
        self.bytes.len() / SLOT_WIDTH
    }

    /// Decode slot `index`, `None` when the row is too short
    pub fn get<T: SlotCodec>(&self, index: usize) -> Option<T> {
        let start = index * SLOT_WIDTH;
        let raw = self.bytes.get(start..start + SLOT_WIDTH)?;
        let mut slot = [0u8; SLOT_WIDTH];
        slot.copy_from_slice(raw);
        Some(T::from_slot(slot))
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Iterate packed rows in storage order
pub fn iter_rows(bytes: &[u8], row_size: usize) -> impl Iterator<Item = RowRef<'_>> {
    bytes.chunks_exact(row_size.max(1)).map(RowRef::new)
}

/// Append-only buffer of fixed-size rows with doubling growth and head compaction
#[derive(Debug, Clone)]
pub struct RowStore {
    row_size: usize,
    capacity: usize,
    count: usize,
    dead: usize,
    data: Vec<u8>,
}

impl RowStore {
    /// Reserve the default number of rows
    pub fn reserve_initial(row_size: usize) -> Result<Self> {
        Self::with_capacity(row_size, DEFAULT_INITIAL_ROWS)
    }

    pub fn with_capacity(row_size: usize, rows: usize) -> Result<Self> {
        if row_size == 0 || rows == 0 {
            return Err(EngineError::validation("row store needs a positive row size and capacity"));
        }
        let data = Self::allocate(row_size, rows)?;
        Ok(Self {
            row_size,
            capacity: rows,
            count: 0,
            dead: 0,
            data,
        })
    }

    fn allocate(row_size: usize, rows: usize) -> Result<Vec<u8>> {
        let err = || EngineError::Allocation {
            requested_rows: rows,
            row_size,
        };
        let bytes = row_size.checked_mul(rows).ok_or_else(err)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes).map_err(|_| err())?;
        data.resize(bytes, 0);
        Ok(data)
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows stored, live and dead
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn dead_count(&self) -> usize {
        self.dead
    }

    pub fn live_count(&self) -> usize {
        self.count - self.dead
    }

    /// Write `row` at position `count`, making room first when full
    pub fn append(&mut self, row: &[u8]) -> Result<()> {
        if row.len() != self.row_size {
            return Err(EngineError::validation(format!(
                "row of {} bytes does not match row size {}",
                row.len(),
                self.row_size
            )));
        }
        if self.count == self.capacity {
            self.make_room()?;
        }
        let start = self.count * self.row_size;
        self.data[start..start + self.row_size].copy_from_slice(row);
        self.count += 1;
        Ok(())
    }

    /// Reclaim dead rows in place when at least half are dead, otherwise double
    pub fn make_room(&mut self) -> Result<()> {
        if self.count > 0 && self.dead * 2 >= self.count {
            self.compact();
            Ok(())
        } else {
            self.grow()
        }
    }

    /// Shift live rows to offset 0; capacity is unchanged
    pub fn compact(&mut self) {
        if self.dead == 0 {
            return;
        }
        let from = self.dead * self.row_size;
        let to = self.count * self.row_size;
        self.data.copy_within(from..to, 0);
        debug!(
            reclaimed = self.dead,
            live = self.live_count(),
            capacity = self.capacity,
            "compacted row store"
        );
        self.count -= self.dead;
        self.dead = 0;
    }

    /// Double the capacity, copying only live rows into the new buffer.
    ///
    /// The old buffer stays in place until the new one is fully populated, so
    /// a failed allocation leaves the store as it was.
    pub fn grow(&mut self) -> Result<()> {
        let new_capacity = self
            .capacity
            .checked_mul(2)
            .ok_or(EngineError::Allocation {
                requested_rows: usize::MAX,
                row_size: self.row_size,
            })?;
        let mut data = Self::allocate(self.row_size, new_capacity)?;
        let live = self.live_bytes();
        data[..live.len()].copy_from_slice(live);

        debug!(
            from = self.capacity,
            to = new_capacity,
            reclaimed = self.dead,
            "grew row store"
        );
        self.data = data;
        self.count -= self.dead;
        self.dead = 0;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Logically remove `n` rows from the front of the live range
    pub fn retire_front(&mut self, n: usize) {
        self.dead = (self.dead + n).min(self.count);
    }

    /// Row at absolute position `index` (dead rows included)
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        if index >= self.count {
            return None;
        }
        let start = index * self.row_size;
        Some(RowRef::new(&self.data[start..start + self.row_size]))
    }

    /// Overwrite one slot of the row at absolute position `index`
    pub fn set_slot<T: SlotCodec>(&mut self, index: usize, slot: usize, value: T) -> Result<()> {
        let slots = self.row_size / SLOT_WIDTH;
        if index >= self.count || slot >= slots {
            return Err(EngineError::validation(format!(
                "slot {slot} of row {index} is out of range"
            )));
        }
        let start = index * self.row_size + slot * SLOT_WIDTH;
        self.data[start..start + SLOT_WIDTH].copy_from_slice(&value.to_slot());
        Ok(())
    }

    /// Contiguous bytes of the live rows, oldest first
    pub fn live_bytes(&self) -> &[u8] {
        &self.data[self.dead * self.row_size..self.count * self.row_size]
    }

    /// Live rows, oldest first
    pub fn live_rows(&self) -> impl DoubleEndedIterator<Item = RowRef<'_>> + '_ {
        self.live_bytes()
            .chunks_exact(self.row_size)
            .map(RowRef::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: i64) -> Vec<u8> {
        let mut bytes = value.to_slot().to_vec();
        bytes.extend_from_slice(&true.to_slot());
        bytes
    }

    fn first_live(store: &RowStore) -> i64 {
        store.live_rows().next().and_then(|r| r.get::<i64>(0)).unwrap()
    }

    #[test]
    fn test_append_within_capacity() {
        let mut store = RowStore::with_capacity(16, 4).unwrap();
        for i in 0..4 {
            store.append(&row(i)).unwrap();
        }
        assert_eq!(store.len(), 4);
        assert_eq!(store.capacity(), 4);
        assert_eq!(store.live_count(), 4);
    }

    #[test]
    fn test_growth_doubles_and_drops_dead_rows() {
        let mut store = RowStore::with_capacity(16, 4).unwrap();
        for i in 0..4 {
            store.append(&row(i)).unwrap();
        }
        store.retire_front(1);
        store.append(&row(4)).unwrap();

        assert_eq!(store.capacity(), 8);
        assert_eq!(store.dead_count(), 0);
        assert_eq!(store.len(), 4);
        assert_eq!(first_live(&store), 1);
    }

    #[test]
    fn test_compaction_when_half_dead() {
        let mut store = RowStore::with_capacity(16, 4).unwrap();
        for i in 0..4 {
            store.append(&row(i)).unwrap();
        }
        store.retire_front(2);
        store.append(&row(4)).unwrap();

        assert_eq!(store.capacity(), 4);
        assert_eq!(store.dead_count(), 0);
        assert_eq!(store.len(), 3);
        let values: Vec<i64> = store.live_rows().map(|r| r.get::<i64>(0).unwrap()).collect();
        assert_eq!(values, vec![2, 3, 4]);
    }

    #[test]
    fn test_rejects_wrong_row_size() {
        let mut store = RowStore::with_capacity(16, 4).unwrap();
        assert!(store.append(&[0u8; 8]).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_slot_round_trips() {
        let mut store = RowStore::with_capacity(16, 2).unwrap();
        store.append(&row(7)).unwrap();
        store.set_slot(0, 1, false).unwrap();
        assert_eq!(store.row(0).unwrap().get::<bool>(1), Some(false));
        assert!(store.set_slot(0, 2, false).is_err());
        assert!(store.set_slot(1, 0, 1i64).is_err());
    }

    #[test]
    fn test_variable_width_columns_rejected() {
        assert!(check_fixed_width(&[ColumnType::Int64, ColumnType::Float32]).is_ok());
        let err = check_fixed_width(&[ColumnType::Bool, ColumnType::Text]).unwrap_err();
        assert_eq!(
            err,
            EngineError::TypeConstraint {
                column: 1,
                type_name: "text".to_string()
            }
        );
        assert!(FieldValue::Text("x".into()).to_slot(0).is_err());
    }
}
