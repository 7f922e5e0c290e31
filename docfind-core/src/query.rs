//! Query construction and filtering API for document stores.
//!
//! A [`Query`] accumulates predicates, an optional sort key, an optional
//! projection and an optional result limit. Queries are assembled with the
//! fluent [`QueryBuilder`] (or the collection-bound finders in
//! [`crate::collection`]) and handed to a backend for execution.
//!
//! # Predicates
//!
//! Predicates form a small tagged AST ([`Expr`]) built with the static
//! helpers on [`Filter`]:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Set membership: `in_set`, `not_in_set`
//! - Text patterns: `matches`, `matches_ci`
//! - Existence: `exists`, `not_exists`
//! - Logical grouping: `and`, `or`
//!
//! Every predicate added to a query joins the top-level conjunction: adding
//! two filters means both must hold. An explicit OR group counts as one
//! conjunct whose members are alternatives.
//!
//! ```ignore
//! use docfind_core::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("is_published", true))
//!     .or([Filter::eq("tags", "frontend"), Filter::eq("tags", "backend")])
//!     .sort("price", SortDirection::Desc)
//!     .select(["name", "author", "price"])
//!     .build()?;
//! ```

use bson::Bson;

use crate::error::{StoreError, StoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification: which field to order by, and in which direction.
///
/// A query holds at most one sort key; setting another replaces it.
#[derive(Debug, Clone)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators.
#[derive(Debug, Clone)]
pub enum FieldOp {
    /// Equal to. On array fields this also matches element membership.
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Value (or any array element) is a member of the given set.
    In,
    /// Value (and every array element) is outside the given set.
    Nin,
}

/// A filter expression tree for matching documents.
///
/// Leaves compare one field against a value; interior nodes combine
/// sub-expressions logically. Evaluation is a pure recursive walk,
/// independent of how any backend stores its documents.
#[derive(Debug, Clone)]
pub enum Expr {
    /// All sub-expressions must match.
    And(Vec<Expr>),
    /// At least one sub-expression must match.
    Or(Vec<Expr>),
    /// Inverts the inner expression.
    Not(Box<Expr>),
    /// Checks whether a field is present (or absent).
    Exists(String, bool),
    /// Field comparison.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
    /// Regular-expression match over a text field.
    ///
    /// Applying this to a non-text value is a type mismatch, reported at
    /// evaluation time.
    Matches {
        /// The field name to test.
        field: String,
        /// The regular expression pattern.
        pattern: String,
        /// Ignore case when matching.
        case_insensitive: bool,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// An existing AND node absorbs the new member; anything else is
    /// wrapped in a fresh two-member AND.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression.
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Static constructors for filter expressions.
///
/// All methods accept field names as `Into<String>` and values as
/// `Into<Bson>` for ergonomics.
///
/// ```ignore
/// use docfind_core::query::Filter;
///
/// let expr = Filter::eq("author", "Alton Hardin")
///     .and(Filter::gte("price", 15));
/// ```
pub struct Filter;

impl Filter {
    /// Field equals the value. On array fields, also matches documents
    /// whose array contains the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Field value (or any of its elements) is one of the given values.
    pub fn in_set(
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Bson>>,
    ) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::In,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Field value (and all of its elements) is none of the given values.
    pub fn not_in_set(
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Bson>>,
    ) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::Nin,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Text field matches the regular expression (case sensitive).
    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::Matches {
            field: field.into(),
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    /// Text field matches the regular expression, ignoring case.
    pub fn matches_ci(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::Matches {
            field: field.into(),
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    /// Field is present on the document.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Field is absent from the document.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Explicit AND group: all members must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Explicit OR group: any member may match.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// A structured query: predicates, sort key, projection and limit.
///
/// `terms` is the top-level conjunction; a document matches when every term
/// matches. An empty term list matches every document in the collection.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Top-level AND set of filter expressions.
    pub terms: Vec<Expr>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
    /// Field names to return; the identifier is always included.
    pub projection: Option<Vec<String>>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates an empty query matching every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Folds the top-level terms into a single expression.
    ///
    /// Returns `None` for an unfiltered query, the sole term when there is
    /// exactly one, and an `And` node otherwise.
    pub fn filter_expr(&self) -> Option<Expr> {
        match self.terms.len() {
            0 => None,
            1 => Some(self.terms[0].clone()),
            _ => Some(Expr::And(self.terms.clone())),
        }
    }
}

/// Fluent builder for [`Query`] values.
///
/// Each predicate-adding call contributes one term to the top-level AND
/// set, so chained calls narrow the result. `build` validates the
/// accumulated state.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
    limit: Option<usize>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    /// Adds a predicate to the top-level AND set.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.query.terms.push(expr);
        self
    }

    /// Adds an explicit OR group as a single AND term.
    ///
    /// Members of the group are independent alternatives, even when they
    /// name the same field. Multiple OR groups on one query combine by AND
    /// between the groups.
    pub fn or(self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.filter(Filter::or(exprs))
    }

    /// Adds an explicit AND group as a single term.
    pub fn and(self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.filter(Filter::and(exprs))
    }

    /// Sets the sort key, replacing any earlier one.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Restricts returned documents to the named fields plus the
    /// identifier. Without a projection, whole documents are returned.
    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.query.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Caps the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validates and returns the final query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] when the limit is zero.
    pub fn build(mut self) -> StoreResult<Query> {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return Err(StoreError::InvalidArgument(
                    "limit must be positive".to_string(),
                ));
            }
            self.query.limit = Some(limit);
        }

        Ok(self.query)
    }
}

/// A field-level update applied by `update_one` style operations.
///
/// `set` writes or replaces fields, `unset` removes them. The identifier
/// field cannot be patched; backends reject a patch that names `id`.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    /// Fields to write or replace.
    pub set: Vec<(String, Bson)>,
    /// Fields to remove.
    pub unset: Vec<String>,
}

impl Patch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Patch::default()
    }

    /// Writes or replaces one field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    /// Removes one field.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Returns true when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }
}

/// Visitor over [`Expr`] trees, implemented by backends to evaluate or
/// translate predicates.
pub trait QueryVisitor {
    type Output;
    type Error: Into<StoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_matches(
        &mut self,
        field: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
            Expr::Matches { field, pattern, case_insensitive } => {
                self.visit_matches(field, pattern, *case_insensitive)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_filters_join_the_top_level_and_set() {
        let query = Query::builder()
            .filter(Filter::eq("is_published", true))
            .filter(Filter::eq("tags", "backend"))
            .build()
            .unwrap();

        assert_eq!(query.terms.len(), 2);
        assert!(matches!(query.filter_expr(), Some(Expr::And(terms)) if terms.len() == 2));
    }

    #[test]
    fn single_term_folds_without_wrapping() {
        let query = Query::builder()
            .filter(Filter::eq("author", "Mosh"))
            .build()
            .unwrap();

        assert!(matches!(query.filter_expr(), Some(Expr::Field { .. })));
    }

    #[test]
    fn empty_query_has_no_filter() {
        let query = Query::new();
        assert!(query.filter_expr().is_none());
    }

    #[test]
    fn or_group_is_one_conjunct() {
        let query = Query::builder()
            .filter(Filter::eq("is_published", true))
            .or([Filter::eq("tags", "frontend"), Filter::eq("tags", "backend")])
            .build()
            .unwrap();

        assert_eq!(query.terms.len(), 2);
        assert!(matches!(&query.terms[1], Expr::Or(members) if members.len() == 2));
    }

    #[test]
    fn later_sort_replaces_earlier() {
        let query = Query::builder()
            .sort("name", SortDirection::Asc)
            .sort("price", SortDirection::Desc)
            .build()
            .unwrap();

        let sort = query.sort.unwrap();
        assert_eq!(sort.field, "price");
        assert!(matches!(sort.direction, SortDirection::Desc));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = Query::builder().limit(0).build().unwrap_err();
        assert!(matches!(err, crate::error::StoreError::InvalidArgument(_)));
    }

    #[test]
    fn positive_limit_is_kept() {
        let query = Query::builder().limit(4).build().unwrap();
        assert_eq!(query.limit, Some(4));
    }

    #[test]
    fn expr_and_absorbs_into_existing_group() {
        let expr = Filter::eq("a", 1)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));

        assert!(matches!(expr, Expr::And(members) if members.len() == 3));
    }

    #[test]
    fn patch_accumulates_sets_and_unsets() {
        let patch = Patch::new()
            .set("author", "Stephen Grider")
            .unset("price");

        assert_eq!(patch.set.len(), 1);
        assert_eq!(patch.unset, vec!["price".to_string()]);
        assert!(!patch.is_empty());
    }
}
