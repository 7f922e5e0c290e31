//! Predicate evaluation over in-memory BSON documents.
//!
//! [`DocumentEvaluator`] walks a query expression tree and decides whether
//! one document matches. Evaluation is pure: the same document and
//! expression always produce the same answer.

use bson::{Bson, datetime::DateTime, Document as BsonDocument};
use regex::{Regex, RegexBuilder};
use std::{cmp::Ordering, collections::HashMap};

use docfind_core::{
    error::{StoreError, StoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable view of a BSON value.
///
/// Numeric widths are normalized to f64 so Int32, Int64 and Double compare
/// with each other. Binary values (uuids among them) compare by bytes.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Bytes(&'a [u8]),
    Array(Vec<Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Bytes(&binary.bytes),
            Bson::Array(items) => {
                Comparable::Array(items.iter().map(Comparable::from).collect())
            }
            // Null, embedded documents and the exotic BSON types are not
            // comparable; they only ever equal nothing.
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Equality with document-store array semantics: a scalar also matches an
/// array field that contains it as an element.
fn values_equal(field_value: &Bson, value: &Bson) -> bool {
    let left = Comparable::from(field_value);
    let right = Comparable::from(value);

    if left == right {
        return true;
    }

    match (&left, &right) {
        (Comparable::Array(items), _) if !matches!(right, Comparable::Array(_)) => {
            items.iter().any(|item| item == &right)
        }
        _ => false,
    }
}

/// Membership test used by `In`/`Nin`. Either side may be a scalar or an
/// array; an array field is a member when any of its elements is.
fn value_in_set(field_value: &Bson, set: &Bson) -> bool {
    let candidates: Vec<&Bson> = match field_value {
        Bson::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let members: Vec<&Bson> = match set {
        Bson::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    candidates.iter().any(|candidate| {
        members
            .iter()
            .any(|member| Comparable::from(*candidate) == Comparable::from(*member))
    })
}

/// Regexes of an expression tree, compiled once up front.
///
/// Pattern compilation is by far the most expensive step of predicate
/// evaluation, so a scan compiles every `Matches` node before the first
/// document is read and evaluation only looks them up. An invalid pattern
/// therefore fails the whole query, even when no document would have
/// reached it.
#[derive(Debug, Default)]
pub(crate) struct CompiledPatterns {
    regexes: HashMap<(String, bool), Regex>,
}

impl CompiledPatterns {
    pub fn compile(expr: &Expr) -> StoreResult<Self> {
        let mut patterns = CompiledPatterns::default();
        patterns.visit_expr(expr)?;
        Ok(patterns)
    }

    fn get(&self, pattern: &str, case_insensitive: bool) -> Option<&Regex> {
        self.regexes
            .get(&(pattern.to_string(), case_insensitive))
    }
}

impl QueryVisitor for CompiledPatterns {
    type Output = ();
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        exprs.iter().try_for_each(|expr| self.visit_expr(expr))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        exprs.iter().try_for_each(|expr| self.visit_expr(expr))
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        self.visit_expr(expr)
    }

    fn visit_exists(
        &mut self,
        _field: &str,
        _should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(())
    }

    fn visit_field(
        &mut self,
        _field: &str,
        _op: &FieldOp,
        _value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        Ok(())
    }

    fn visit_matches(
        &mut self,
        _field: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self::Output, Self::Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| StoreError::InvalidArgument(format!("bad pattern `{pattern}`: {e}")))?;

        self.regexes
            .insert((pattern.to_string(), case_insensitive), regex);

        Ok(())
    }
}

/// An optional filter bound to its compiled patterns, ready to match any
/// number of documents.
pub(crate) struct FilterMatcher {
    filter: Option<Expr>,
    patterns: CompiledPatterns,
}

impl FilterMatcher {
    pub fn new(filter: Option<Expr>) -> StoreResult<Self> {
        let patterns = match &filter {
            Some(expr) => CompiledPatterns::compile(expr)?,
            None => CompiledPatterns::default(),
        };

        Ok(Self { filter, patterns })
    }

    /// Decides whether one document matches. No filter matches everything.
    pub fn matches(&self, document: &Bson) -> StoreResult<bool> {
        match &self.filter {
            Some(expr) => DocumentEvaluator::new(document, &self.patterns).evaluate(expr),
            None => Ok(true),
        }
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Bson,
    patterns: &'a CompiledPatterns,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson, patterns: &'a CompiledPatterns) -> Self {
        Self { document, patterns }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> StoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns the documents matching the expression, in input order.
    ///
    /// Evaluation errors (a pattern over a non-text field, a bad regex)
    /// abort the whole scan rather than dropping the offending document.
    pub fn filter_documents<'d>(
        documents: impl IntoIterator<Item = &'d Bson>,
        expr: &Expr,
    ) -> StoreResult<Vec<Bson>> {
        let patterns = CompiledPatterns::compile(expr)?;
        let mut matched = Vec::new();

        for doc in documents {
            if DocumentEvaluator::new(doc, &patterns).evaluate(expr)? {
                matched.push(doc.clone());
            }
        }

        Ok(matched)
    }

    fn fields(&self) -> StoreResult<&'a BsonDocument> {
        self.document
            .as_document()
            .ok_or_else(|| StoreError::Backend("stored value is not a document".to_string()))
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(self.fields()?.get(field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.fields()?.get(field) else {
            // A missing field matches nothing, except inequality.
            return Ok(matches!(op, FieldOp::Ne | FieldOp::Nin));
        };

        match op {
            FieldOp::Eq => Ok(values_equal(field_value, value)),
            FieldOp::Ne => Ok(!values_equal(field_value, value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => Ok(match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        FieldOp::Lte => ordering != Ordering::Greater,
                        _ => unreachable!(),
                    }),
                    None => Ok(false),
                }
            }
            FieldOp::In => Ok(value_in_set(field_value, value)),
            FieldOp::Nin => Ok(!value_in_set(field_value, value)),
        }
    }

    fn visit_matches(
        &mut self,
        field: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.fields()?.get(field) else {
            return Ok(false);
        };

        let Bson::String(text) = field_value else {
            return Err(StoreError::TypeMismatch(format!(
                "pattern match on non-text field `{field}`"
            )));
        };

        // Patterns were compiled before the scan started.
        let regex = self
            .patterns
            .get(pattern, case_insensitive)
            .ok_or_else(|| StoreError::Backend(format!("pattern `{pattern}` was not compiled")))?;

        Ok(regex.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docfind_core::query::Filter;

    fn course() -> Bson {
        Bson::Document(doc! {
            "name": "Node.js Course",
            "author": "Stephen Grider",
            "tags": ["backend", "nodejs"],
            "price": 15,
            "is_published": true,
        })
    }

    fn eval_doc(doc: &Bson, expr: &Expr) -> StoreResult<bool> {
        FilterMatcher::new(Some(expr.clone()))?.matches(doc)
    }

    fn eval(expr: &Expr) -> StoreResult<bool> {
        eval_doc(&course(), expr)
    }

    #[test]
    fn equality_on_scalars() {
        assert!(eval(&Filter::eq("author", "Stephen Grider")).unwrap());
        assert!(!eval(&Filter::eq("author", "Mosh")).unwrap());
        assert!(eval(&Filter::ne("author", "Mosh")).unwrap());
    }

    #[test]
    fn equality_on_arrays_matches_elements() {
        assert!(eval(&Filter::eq("tags", "backend")).unwrap());
        assert!(!eval(&Filter::eq("tags", "frontend")).unwrap());
        // Whole-array equality still holds.
        assert!(eval(&Filter::eq("tags", vec!["backend", "nodejs"])).unwrap());
    }

    #[test]
    fn comparisons_normalize_numeric_widths() {
        assert!(eval(&Filter::gte("price", 15i64)).unwrap());
        assert!(eval(&Filter::lte("price", 35.0)).unwrap());
        assert!(!eval(&Filter::gt("price", 15)).unwrap());
        assert!(eval(&Filter::lt("price", 20)).unwrap());
    }

    #[test]
    fn incomparable_types_never_match() {
        assert!(!eval(&Filter::gt("author", 10)).unwrap());
    }

    #[test]
    fn set_membership() {
        assert!(eval(&Filter::in_set("price", [10, 15, 20])).unwrap());
        assert!(!eval(&Filter::in_set("price", [30, 35])).unwrap());
        assert!(eval(&Filter::not_in_set("price", [30, 35])).unwrap());
        // Array field: any element counts.
        assert!(eval(&Filter::in_set("tags", ["frontend", "backend"])).unwrap());
        assert!(!eval(&Filter::not_in_set("tags", ["nodejs"])).unwrap());
    }

    #[test]
    fn missing_field_matches_only_negations() {
        assert!(!eval(&Filter::eq("level", "beginner")).unwrap());
        assert!(eval(&Filter::ne("level", "beginner")).unwrap());
        assert!(eval(&Filter::not_in_set("level", ["a", "b"])).unwrap());
        assert!(!eval(&Filter::matches("level", "x")).unwrap());
    }

    #[test]
    fn exists_checks_presence() {
        assert!(eval(&Filter::exists("price")).unwrap());
        assert!(eval(&Filter::not_exists("level")).unwrap());
    }

    #[test]
    fn pattern_matching_with_case_flag() {
        assert!(eval(&Filter::matches("author", "^Stephen")).unwrap());
        assert!(!eval(&Filter::matches("author", "^stephen")).unwrap());
        assert!(eval(&Filter::matches_ci("author", "^stephen")).unwrap());
        assert!(eval(&Filter::matches_ci("name", ".*node.*")).unwrap());
    }

    #[test]
    fn pattern_on_non_text_field_is_a_type_mismatch() {
        let err = eval(&Filter::matches("price", ".*")).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch(_)));
    }

    #[test]
    fn bad_pattern_is_an_invalid_argument() {
        let err = eval(&Filter::matches("author", "(")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn patterns_compile_before_any_document_is_read() {
        // Compilation happens up front, so a bad pattern is reported even
        // when no document carries the field.
        let docs = vec![Bson::Document(doc! { "name": "x" })];
        let err =
            DocumentEvaluator::filter_documents(docs.iter(), &Filter::matches("level", "("))
                .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));

        // One compiled pattern serves the whole scan.
        let patterns = CompiledPatterns::compile(&Filter::matches_ci("author", "^s")).unwrap();
        assert!(patterns.get("^s", true).is_some());
        assert!(patterns.get("^s", false).is_none());
    }

    #[test]
    fn logical_composition() {
        let expr = Filter::and([
            Filter::eq("is_published", true),
            Filter::or([Filter::eq("tags", "frontend"), Filter::eq("tags", "backend")]),
        ]);
        assert!(eval(&expr).unwrap());

        let expr = Filter::eq("author", "Mosh").or(Filter::matches("name", ".*Node.*"));
        assert!(eval(&expr).unwrap());

        assert!(eval(&Filter::eq("is_published", false).not()).unwrap());
    }

    #[test]
    fn filter_documents_propagates_errors() {
        let docs = vec![course()];
        let err =
            DocumentEvaluator::filter_documents(docs.iter(), &Filter::matches("price", ".*"))
                .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch(_)));
    }

    #[test]
    fn uuids_compare_by_bytes() {
        let id = bson::Uuid::new();
        let doc = Bson::Document(doc! { "id": id, "name": "x" });
        assert!(eval_doc(&doc, &Filter::eq("id", id)).unwrap());
    }
}
