//! Structural compatibility between a declared type and an inferred one.
//!
//! The first operand is always the declared (user-written) type and the
//! second the inferred one. Compatibility is not symmetric: a declared
//! fixed-size array accepts any inferred capacity up to its own.
//!
//! On failure the error carries the offending descriptor, which the caller
//! uses to point a diagnostic at the right place.

use crate::ty::{NodeType, TypeDescriptor};
use std::fmt;
use thiserror::Error;

/// Recursion limit for descriptor comparison.
pub const MAX_TYPE_DEPTH: usize = 64;

/// Which operand of a comparison a descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Declared,
    Inferred,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Declared => write!(f, "declared"),
            Side::Inferred => write!(f, "inferred"),
        }
    }
}

/// Key or value position of a map type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSide {
    Key,
    Value,
}

impl fmt::Display for MapSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapSide::Key => write!(f, "key"),
            MapSide::Value => write!(f, "value"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    KindMismatch { expected: String, found: String },
    CapacityTooSmall { declared: i64, inferred: i64 },
    InvalidSize { size: String },
    MissingChild,
    ShapeMismatch,
    MissingSide { side: MapSide },
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KindMismatch { expected, found } => {
                write!(f, "expected `{expected}`, found `{found}`")
            }
            Self::CapacityTooSmall { declared, inferred } => {
                write!(f, "array capacity {declared} is smaller than {inferred}")
            }
            Self::InvalidSize { size } => write!(f, "`{size}` is not a valid array size"),
            Self::MissingChild => write!(f, "element type is missing"),
            Self::ShapeMismatch => write!(f, "cannot compare a map with a non-map type"),
            Self::MissingSide { side } => write!(f, "map {side} type is missing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid type descriptor: the {side} type is absent")]
    InvalidDescriptor { side: Side },
    #[error("type mismatch at `{offending}` ({side}): {reason}")]
    Mismatch {
        offending: TypeDescriptor,
        side: Side,
        reason: MismatchReason,
    },
    #[error("type nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
}

impl TypeError {
    /// The descriptor a diagnostic should point at, if any.
    pub fn offending(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeError::Mismatch { offending, .. } => Some(offending),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&MismatchReason> {
        match self {
            TypeError::Mismatch { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

// ── Node types ──

/// Compare two node types.
///
/// Kinds must match at every level; a declared size must be at least the
/// inferred size when both are present; child presence must agree.
pub fn deep_equal_node(
    declared: Option<&NodeType>,
    inferred: Option<&NodeType>,
) -> Result<(), TypeError> {
    let declared = declared.ok_or(TypeError::InvalidDescriptor {
        side: Side::Declared,
    })?;
    let inferred = inferred.ok_or(TypeError::InvalidDescriptor {
        side: Side::Inferred,
    })?;
    node_equal(declared, inferred, 0).inspect_err(|err| {
        tracing::debug!(%declared, %inferred, %err, "node types differ");
    })
}

fn node_equal(v1: &NodeType, v2: &NodeType, depth: usize) -> Result<(), TypeError> {
    guard(depth)?;
    if v1.kind != v2.kind {
        return Err(node_mismatch(
            v2,
            Side::Inferred,
            MismatchReason::KindMismatch {
                expected: v1.kind.clone(),
                found: v2.kind.clone(),
            },
        ));
    }
    if let (Some(s1), Some(s2)) = (&v1.size, &v2.size) {
        let declared = parse_size(v1, s1, Side::Declared)?;
        let inferred = parse_size(v2, s2, Side::Inferred)?;
        if declared < inferred {
            return Err(node_mismatch(
                v2,
                Side::Inferred,
                MismatchReason::CapacityTooSmall { declared, inferred },
            ));
        }
    }
    children_equal(v1, v2, depth)
}

fn children_equal(v1: &NodeType, v2: &NodeType, depth: usize) -> Result<(), TypeError> {
    match (v1.child(), v2.child()) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(node_mismatch(v1, Side::Declared, MismatchReason::MissingChild)),
        (Some(_), None) => Err(node_mismatch(v2, Side::Inferred, MismatchReason::MissingChild)),
        (Some(c1), Some(c2)) => node_equal(c1, c2, depth + 1),
    }
}

fn parse_size(node: &NodeType, size: &str, side: Side) -> Result<i64, TypeError> {
    size.trim().parse::<i64>().map_err(|_| {
        node_mismatch(
            node,
            side,
            MismatchReason::InvalidSize {
                size: size.to_string(),
            },
        )
    })
}

// ── Map types ──

/// Compare two descriptors where at least one side is expected to be a map.
///
/// Node against node at this entry compares only the element types: base
/// kinds are assumed to have been matched by whoever dispatched here. Use
/// [`check_compatible`] when that is not the case. Map key and value types
/// are always kind-checked.
pub fn deep_equal_map(declared: &TypeDescriptor, inferred: &TypeDescriptor) -> Result<(), TypeError> {
    map_equal(declared, inferred, 0).inspect_err(|err| {
        tracing::debug!(%declared, %inferred, %err, "map types differ");
    })
}

fn map_equal(v1: &TypeDescriptor, v2: &TypeDescriptor, depth: usize) -> Result<(), TypeError> {
    guard(depth)?;
    match (v1, v2) {
        (TypeDescriptor::Node(n1), TypeDescriptor::Node(n2)) => children_equal(n1, n2, depth),
        (TypeDescriptor::Map(m1), TypeDescriptor::Map(m2)) => {
            side_equal(v1, v2, m1.left(), m2.left(), MapSide::Key, depth)?;
            side_equal(v1, v2, m1.right(), m2.right(), MapSide::Value, depth)
        }
        _ => Err(TypeError::Mismatch {
            offending: v2.clone(),
            side: Side::Inferred,
            reason: MismatchReason::ShapeMismatch,
        }),
    }
}

fn side_equal(
    owner1: &TypeDescriptor,
    owner2: &TypeDescriptor,
    s1: Option<&TypeDescriptor>,
    s2: Option<&TypeDescriptor>,
    which: MapSide,
    depth: usize,
) -> Result<(), TypeError> {
    match (s1, s2) {
        (None, None) => Ok(()),
        // The error names the map that still has the side.
        (Some(_), None) => Err(TypeError::Mismatch {
            offending: owner1.clone(),
            side: Side::Declared,
            reason: MismatchReason::MissingSide { side: which },
        }),
        (None, Some(_)) => Err(TypeError::Mismatch {
            offending: owner2.clone(),
            side: Side::Inferred,
            reason: MismatchReason::MissingSide { side: which },
        }),
        (Some(a), Some(b)) => side_type_equal(a, b, depth + 1),
    }
}

/// Key and value types are checked in full, kinds included.
fn side_type_equal(a: &TypeDescriptor, b: &TypeDescriptor, depth: usize) -> Result<(), TypeError> {
    match (a, b) {
        (TypeDescriptor::Node(n1), TypeDescriptor::Node(n2)) => node_equal(n1, n2, depth),
        _ => map_equal(a, b, depth),
    }
}

/// Full compatibility check for arbitrary descriptors.
///
/// Two node types go through [`deep_equal_node`], kind check included;
/// anything involving a map goes through [`deep_equal_map`].
pub fn check_compatible(declared: &TypeDescriptor, inferred: &TypeDescriptor) -> Result<(), TypeError> {
    match (declared, inferred) {
        (TypeDescriptor::Node(n1), TypeDescriptor::Node(n2)) => deep_equal_node(Some(n1), Some(n2)),
        _ => deep_equal_map(declared, inferred),
    }
}

fn guard(depth: usize) -> Result<(), TypeError> {
    if depth > MAX_TYPE_DEPTH {
        Err(TypeError::TooDeep {
            limit: MAX_TYPE_DEPTH,
        })
    } else {
        Ok(())
    }
}

fn node_mismatch(node: &NodeType, side: Side, reason: MismatchReason) -> TypeError {
    TypeError::Mismatch {
        offending: TypeDescriptor::Node(node.clone()),
        side,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::MapType;
    use pretty_assertions::assert_eq;

    fn int() -> NodeType {
        NodeType::scalar("int")
    }

    fn string() -> NodeType {
        NodeType::scalar("string")
    }

    fn node(n: NodeType) -> TypeDescriptor {
        TypeDescriptor::Node(n)
    }

    #[test]
    fn identical_scalars_are_equal() {
        assert_eq!(deep_equal_node(Some(&int()), Some(&int())), Ok(()));
    }

    #[test]
    fn scalar_kind_mismatch_names_inferred() {
        let err = deep_equal_node(Some(&int()), Some(&string())).unwrap_err();
        assert_eq!(err.offending(), Some(&node(string())));
        assert_eq!(
            err.reason(),
            Some(&MismatchReason::KindMismatch {
                expected: "int".into(),
                found: "string".into(),
            })
        );
    }

    #[test]
    fn larger_declared_capacity_accepts_smaller_literal() {
        let declared = NodeType::sized_array("5", int());
        let inferred = NodeType::sized_array("3", int());
        assert_eq!(deep_equal_node(Some(&declared), Some(&inferred)), Ok(()));
    }

    #[test]
    fn smaller_declared_capacity_is_rejected() {
        let declared = NodeType::sized_array("2", int());
        let inferred = NodeType::sized_array("3", int());
        let err = deep_equal_node(Some(&declared), Some(&inferred)).unwrap_err();
        assert_eq!(err.offending(), Some(&node(inferred)));
        assert_eq!(
            err.reason(),
            Some(&MismatchReason::CapacityTooSmall {
                declared: 2,
                inferred: 3
            })
        );
    }

    #[test]
    fn size_only_on_one_side_is_ignored() {
        let declared = NodeType::sized_array("2", int());
        let inferred = NodeType::array(int());
        assert_eq!(deep_equal_node(Some(&declared), Some(&inferred)), Ok(()));
        assert_eq!(deep_equal_node(Some(&inferred), Some(&declared)), Ok(()));
    }

    #[test]
    fn unparseable_size_is_reported() {
        let declared = NodeType::sized_array("two", int());
        let inferred = NodeType::sized_array("3", int());
        let err = deep_equal_node(Some(&declared), Some(&inferred)).unwrap_err();
        assert_eq!(err.offending(), Some(&node(declared)));
        assert!(matches!(
            err,
            TypeError::Mismatch {
                side: Side::Declared,
                reason: MismatchReason::InvalidSize { .. },
                ..
            }
        ));
    }

    #[test]
    fn missing_child_names_the_childless_node() {
        let bare = NodeType::scalar("array");
        let full = NodeType::array(int());
        let err = deep_equal_node(Some(&bare), Some(&full)).unwrap_err();
        assert_eq!(err.offending(), Some(&node(bare.clone())));

        let err = deep_equal_node(Some(&full), Some(&bare)).unwrap_err();
        assert_eq!(err.offending(), Some(&node(bare)));
    }

    #[test]
    fn nested_depth_difference_fails_at_first_divergent_level() {
        let declared = NodeType::array(int());
        let inferred = NodeType::array(NodeType::array(int()));
        let err = deep_equal_node(Some(&declared), Some(&inferred)).unwrap_err();
        // Kinds are compared before children, so `int` vs `array(int)` is a kind mismatch.
        assert_eq!(err.offending(), Some(&node(NodeType::array(int()))));
    }

    #[test]
    fn absent_operand_is_invalid() {
        assert_eq!(
            deep_equal_node(None, Some(&int())),
            Err(TypeError::InvalidDescriptor {
                side: Side::Declared
            })
        );
        assert_eq!(
            deep_equal_node(Some(&int()), None),
            Err(TypeError::InvalidDescriptor {
                side: Side::Inferred
            })
        );
    }

    #[test]
    fn equal_maps() {
        let a = TypeDescriptor::Map(MapType::new(string(), int()));
        let b = a.clone();
        assert_eq!(deep_equal_map(&a, &b), Ok(()));
    }

    #[test]
    fn map_value_mismatch_names_inner_inferred() {
        let a = TypeDescriptor::Map(MapType::new(string(), NodeType::array(int())));
        let b = TypeDescriptor::Map(MapType::new(string(), NodeType::array(string())));
        let err = deep_equal_map(&a, &b).unwrap_err();
        assert_eq!(err.offending(), Some(&node(string())));
    }

    #[test]
    fn map_against_node_is_shape_mismatch() {
        let map = TypeDescriptor::Map(MapType::new(string(), int()));
        let arr = node(NodeType::array(int()));
        let err = deep_equal_map(&map, &arr).unwrap_err();
        assert_eq!(err.offending(), Some(&arr));
        assert_eq!(err.reason(), Some(&MismatchReason::ShapeMismatch));

        let err = deep_equal_map(&arr, &map).unwrap_err();
        assert_eq!(err.offending(), Some(&map));
    }

    #[test]
    fn missing_side_names_map_that_has_it() {
        let full = TypeDescriptor::Map(MapType::new(string(), int()));
        let partial = TypeDescriptor::Map(MapType {
            left: Some(Box::new(node(string()))),
            right: None,
        });
        let err = deep_equal_map(&full, &partial).unwrap_err();
        assert_eq!(err.offending(), Some(&full));
        assert_eq!(
            err.reason(),
            Some(&MismatchReason::MissingSide {
                side: MapSide::Value
            })
        );
    }

    #[test]
    fn key_failure_short_circuits() {
        let a = TypeDescriptor::Map(MapType::new(int(), int()));
        let b = TypeDescriptor::Map(MapType::new(string(), string()));
        let err = deep_equal_map(&a, &b).unwrap_err();
        assert_eq!(err.offending(), Some(&node(string())));
        assert!(matches!(
            err.reason(),
            Some(MismatchReason::KindMismatch { expected, .. }) if expected == "int"
        ));
    }

    #[test]
    fn scalar_key_and_value_kinds_are_checked() {
        let declared = TypeDescriptor::Map(MapType::new(string(), int()));
        let inferred = TypeDescriptor::Map(MapType::new(int(), NodeType::scalar("bool")));
        let err = check_compatible(&declared, &inferred).unwrap_err();
        assert_eq!(err.offending(), Some(&node(int())));

        let inferred = TypeDescriptor::Map(MapType::new(string(), NodeType::scalar("bool")));
        let err = deep_equal_map(&declared, &inferred).unwrap_err();
        assert_eq!(
            err.reason(),
            Some(&MismatchReason::KindMismatch {
                expected: "int".into(),
                found: "bool".into(),
            })
        );
    }

    #[test]
    fn nested_map_values_are_kind_checked() {
        let declared = TypeDescriptor::Map(MapType::new(
            string(),
            MapType::new(string(), int()),
        ));
        let inferred = TypeDescriptor::Map(MapType::new(
            string(),
            MapType::new(string(), string()),
        ));
        let err = check_compatible(&declared, &inferred).unwrap_err();
        assert_eq!(err.offending(), Some(&node(string())));
    }

    #[test]
    fn bare_maps_are_equal() {
        let a = TypeDescriptor::Map(MapType::default());
        assert_eq!(deep_equal_map(&a, &a.clone()), Ok(()));
    }

    #[test]
    fn node_pair_in_map_check_skips_top_level_kind() {
        // Only element types are compared at the entry level.
        let a = node(NodeType::scalar("int"));
        let b = node(NodeType::scalar("string"));
        assert_eq!(deep_equal_map(&a, &b), Ok(()));
        assert!(check_compatible(&a, &b).is_err());
    }

    #[test]
    fn map_value_arrays_compare_element_types() {
        let a = TypeDescriptor::Map(MapType::new(string(), NodeType::sized_array("4", int())));
        let b = TypeDescriptor::Map(MapType::new(string(), NodeType::sized_array("2", int())));
        assert_eq!(check_compatible(&a, &b), Ok(()));

        let c = TypeDescriptor::Map(MapType::new(string(), NodeType::array(string())));
        let err = check_compatible(&a, &c).unwrap_err();
        assert_eq!(err.offending(), Some(&node(string())));
    }

    #[test]
    fn deep_nesting_hits_limit() {
        let mut deep = int();
        for _ in 0..(MAX_TYPE_DEPTH + 2) {
            deep = NodeType::array(deep);
        }
        assert_eq!(
            deep_equal_node(Some(&deep), Some(&deep.clone())),
            Err(TypeError::TooDeep {
                limit: MAX_TYPE_DEPTH
            })
        );
    }
}
