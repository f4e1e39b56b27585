//! relq-rewrite - equivalence-preserving rewrite rules over the relq algebra
//!
//! Each rule is a local, single-step transform: it borrows its input and
//! returns a freshly built tree, so chaining and search stay a caller
//! concern. Every rule preserves the denoted result set of its input.
//! Structural preconditions fail with a `RewriteError`; the applicability
//! checks of rules 4, 6 and 12 answer with a boolean or classification
//! instead of failing.

pub mod error;
pub mod join;
pub mod projection;
pub mod restriction;
pub mod set_ops;

pub use error::{RewriteError, RewriteResult};
pub use join::{
    associate_chain, chain_associativity, commute_join, join_commutes, Associativity, Direction,
};
pub use projection::{
    collapse_projections, commute_restriction_projection, push_projection_into_join,
    restriction_projection_commute,
};
pub use restriction::{
    cascade_restriction, classify_restriction_join, commute_restrictions, fuse_restriction_cross,
    merge_restrictions, push_restriction_into_join, PushTarget,
};
pub use set_ops::{
    commute_set_operation, push_projection_into_union, push_restriction_into_difference,
    push_restriction_into_intersection, push_restriction_into_set_op, set_operation_commutes,
    Side,
};
