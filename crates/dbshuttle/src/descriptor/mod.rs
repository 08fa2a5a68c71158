//! Canonical, engine-neutral descriptors for database structure.
//!
//! Every engine converts its own catalog into these types and back; no two
//! engines ever talk to each other's representations directly. The model is
//! pure data: the only behavior is cloning and lookup helpers used by the
//! mapping passes.
//!
//! - [`database`]: database, table, column, key and sequence descriptors
//! - [`datatype`]: the canonical data type tags all store types pivot through
//! - [`expression`]: the canonical default/computed expression forms

pub mod database;
pub mod datatype;
pub mod expression;

pub use database::{
    ColumnDescriptor, DatabaseDescriptor, ForeignKeyDescriptor, IdentityDescriptor,
    IndexDescriptor, PrimaryKeyDescriptor, ReferentialAction, SequenceDescriptor,
    TableDescriptor, UniqueDescriptor, VendorOptions,
};
pub use datatype::DataTypeDescriptor;
pub use expression::{SqlExpressionDescriptor, WellKnownFunction};
