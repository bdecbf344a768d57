use std::collections::BTreeSet;
use std::fmt;

use crate::node_maker::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

/// A filter over pattern variables, as written in the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterExpr {
    Variable(String),
    Constant(Node),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare(CompareOp, Box<FilterExpr>, Box<FilterExpr>),
    Arithmetic(ArithmeticOp, Box<FilterExpr>, Box<FilterExpr>),
    Bound(String),
    IsIri(Box<FilterExpr>),
    IsBlank(Box<FilterExpr>),
    IsLiteral(Box<FilterExpr>),
    Lang(Box<FilterExpr>),
    Datatype(Box<FilterExpr>),
    Str(Box<FilterExpr>),
    LangMatches(Box<FilterExpr>, Box<FilterExpr>),
    Regex(Box<FilterExpr>, Box<FilterExpr>, Option<Box<FilterExpr>>),
    SameTerm(Box<FilterExpr>, Box<FilterExpr>),
    /// Any other function call; never pushed into SQL.
    Function(String, Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn variable(name: impl Into<String>) -> Self {
        FilterExpr::Variable(name.into())
    }

    pub fn and(a: FilterExpr, b: FilterExpr) -> Self {
        FilterExpr::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: FilterExpr, b: FilterExpr) -> Self {
        FilterExpr::Or(Box::new(a), Box::new(b))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(a: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(a))
    }

    pub fn compare(op: CompareOp, a: FilterExpr, b: FilterExpr) -> Self {
        FilterExpr::Compare(op, Box::new(a), Box::new(b))
    }

    /// Conjunction of all `parts`, `None` when there are none.
    pub fn all(parts: impl IntoIterator<Item = FilterExpr>) -> Option<Self> {
        parts.into_iter().reduce(FilterExpr::and)
    }

    /// Neither a connective nor a negation.
    pub fn is_atomic(&self) -> bool {
        !matches!(self, FilterExpr::And(..) | FilterExpr::Or(..) | FilterExpr::Not(_))
    }

    pub fn variables(&self) -> BTreeSet<String> {
        let mut variables = BTreeSet::new();
        self.collect_variables(&mut variables);
        variables
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            FilterExpr::Variable(v) | FilterExpr::Bound(v) => {
                out.insert(v.clone());
            }
            FilterExpr::Constant(_) => {}
            FilterExpr::Not(a)
            | FilterExpr::IsIri(a)
            | FilterExpr::IsBlank(a)
            | FilterExpr::IsLiteral(a)
            | FilterExpr::Lang(a)
            | FilterExpr::Datatype(a)
            | FilterExpr::Str(a) => a.collect_variables(out),
            FilterExpr::And(a, b)
            | FilterExpr::Or(a, b)
            | FilterExpr::Compare(_, a, b)
            | FilterExpr::Arithmetic(_, a, b)
            | FilterExpr::LangMatches(a, b)
            | FilterExpr::SameTerm(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            FilterExpr::Regex(a, b, c) => {
                a.collect_variables(out);
                b.collect_variables(out);
                if let Some(c) = c {
                    c.collect_variables(out);
                }
            }
            FilterExpr::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Variable(v) => write!(f, "?{}", v),
            FilterExpr::Constant(node) => write!(f, "{}", node),
            FilterExpr::And(a, b) => write!(f, "({} && {})", a, b),
            FilterExpr::Or(a, b) => write!(f, "({} || {})", a, b),
            FilterExpr::Not(a) => write!(f, "!{}", a),
            FilterExpr::Compare(op, a, b) => write!(f, "({} {} {})", a, op.symbol(), b),
            FilterExpr::Arithmetic(op, a, b) => write!(f, "({} {} {})", a, op.symbol(), b),
            FilterExpr::Bound(v) => write!(f, "bound(?{})", v),
            FilterExpr::IsIri(a) => write!(f, "isIRI({})", a),
            FilterExpr::IsBlank(a) => write!(f, "isBlank({})", a),
            FilterExpr::IsLiteral(a) => write!(f, "isLiteral({})", a),
            FilterExpr::Lang(a) => write!(f, "lang({})", a),
            FilterExpr::Datatype(a) => write!(f, "datatype({})", a),
            FilterExpr::Str(a) => write!(f, "str({})", a),
            FilterExpr::LangMatches(a, b) => write!(f, "langMatches({}, {})", a, b),
            FilterExpr::Regex(a, b, None) => write!(f, "regex({}, {})", a, b),
            FilterExpr::Regex(a, b, Some(c)) => write!(f, "regex({}, {}, {})", a, b, c),
            FilterExpr::SameTerm(a, b) => write!(f, "sameTerm({}, {})", a, b),
            FilterExpr::Function(name, args) => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
        }
    }
}
