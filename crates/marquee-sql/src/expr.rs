//! SQL expressions.

use crate::Value;

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// An inline literal, escaped into the SQL text
    Literal(Value),
    /// A named parameter bound to a value, rendered as $n
    Param { name: String, value: Value },
    /// A column reference
    Column(ColumnRef),
    /// Binary operation (e.g., a = b, a AND b)
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },
    /// LIKE / ILIKE pattern match
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        case_insensitive: bool,
    },
    /// expr IN (values...)
    InList { expr: Box<Expr>, list: Vec<Expr> },
    /// NOT expr
    Not(Box<Expr>),
    /// Raw SQL (escape hatch)
    Raw(String),
}

/// A column reference, optionally qualified with a table name or join alias.
///
/// The qualifier is whatever name the column is in scope under. When the
/// same table is joined twice, each join introduces its own alias and the
/// qualifier disambiguates which side a column belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        }
    }
}

// Convenience constructors
impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// A named parameter carrying its bound value.
    pub fn param(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Param {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn qualified_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::qualified(table, column))
    }

    /// Create an equality expression: self = other
    pub fn eq(self, other: Expr) -> Self {
        self.binop(BinOp::Eq, other)
    }

    /// Create an inequality expression: self <> other
    pub fn ne(self, other: Expr) -> Self {
        self.binop(BinOp::Ne, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        self.binop(BinOp::Lt, other)
    }

    pub fn le(self, other: Expr) -> Self {
        self.binop(BinOp::Le, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        self.binop(BinOp::Gt, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        self.binop(BinOp::Ge, other)
    }

    /// Create an AND expression: self AND other
    pub fn and(self, other: Expr) -> Self {
        self.binop(BinOp::And, other)
    }

    /// Create an OR expression: self OR other
    pub fn or(self, other: Expr) -> Self {
        self.binop(BinOp::Or, other)
    }

    /// Create IS NULL expression
    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// Create IS NOT NULL expression
    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// Create LIKE expression
    pub fn like(self, pattern: Expr) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: Box::new(pattern),
            case_insensitive: false,
        }
    }

    /// Create ILIKE expression
    pub fn ilike(self, pattern: Expr) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: Box::new(pattern),
            case_insensitive: true,
        }
    }

    /// Create an IN expression over a list of values.
    ///
    /// Each element is bound as its own parameter, so embedded quotes in
    /// list members never reach the SQL text.
    pub fn in_list(
        self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        let name = name.into();
        let list = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Expr::param(format!("{name}_{i}"), v))
            .collect();
        Expr::InList {
            expr: Box::new(self),
            list,
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    fn binop(self, op: BinOp, other: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }
}
