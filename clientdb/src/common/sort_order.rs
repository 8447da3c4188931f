/// Specifies the direction for sorting documents.
///
/// # Purpose
/// Defines whether documents should be sorted in ascending (low to high) or descending
/// (high to low) order. Used by [`crate::collection::Cluster::sort`] to control result
/// ordering.
///
/// # Variants
/// - `Ascending`: Sort from smallest to largest value (A to Z, 0 to 9)
/// - `Descending`: Sort from largest to smallest value (Z to A, 9 to 0)
///
/// # Characteristics
/// - **Copy**: Can be copied instead of cloned
/// - **Comparable**: Can be compared for equality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A)
    Descending,
}
