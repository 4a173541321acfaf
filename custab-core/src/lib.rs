//! CUSTAB Core - Layered Table Layout Types
//!
//! Types and pure algorithms for user-customizable column and filter
//! layouts. An administrator defines a baseline per module; users override
//! it sparsely; reads merge the two layers. Nothing here performs I/O.

pub mod batch;
pub mod config;
pub mod entities;
pub mod error;
pub mod kind;
pub mod merge;
pub mod nullify;
pub mod payload;
mod wire;

use uuid::Uuid;

pub use batch::{
    plan_baseline_batch, route_override_batch, validate_override_batch, BaselineOp, BaselinePlan,
    BatchOutcome, OverrideOp, OverridePlan, OverrideWrite,
};
pub use config::{DeleteScope, LayoutConfig, OverrideMatchScope};
pub use entities::{
    BaselineItem, BaselineSubmission, EffectiveItem, OverrideItem, OverrideSubmission, StatusTag,
};
pub use error::{
    require_key, ConfigError, LayoutError, LayoutResult, RequiredKey, StorageError,
    ValidationError,
};
pub use kind::{
    validate_width, Column, ColumnAttrs, ColumnField, ColumnOverrides, ExtraFields, Filter,
    FilterField, ItemKind, KindTag, NoExtras, OverrideField, ResolvedColumn,
};
pub use merge::{merge_layers, order_baseline, resolve_item};
pub use nullify::{plan_nullify, DroppedField, NullifyEntry, NullifyPlan};
pub use payload::{
    decode_baseline_batch, decode_nullify_request, decode_override_batch, decode_width_request,
    WidthRequest,
};

/// Generate a new UUIDv7 row id (timestamp-sortable).
pub fn new_item_id() -> Uuid {
    Uuid::now_v7()
}
