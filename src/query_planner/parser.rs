//! Text syntax for triple patterns and filters.
//!
//! ```text
//! PREFIX ex: <http://example.org/>
//! ?person a ex:Person ; ex:name ?name .
//! FILTER (langMatches(lang(?name), "en") && ?age >= 18)
//! ```
//!
//! Patterns use the usual SPARQL term syntax: `?v`, `<iri>`, `prefix:local`,
//! `_:label`, `a`, quoted literals with `@lang` or `^^datatype`, numbers and
//! booleans. The body may be wrapped in `WHERE { ... }`.

use std::collections::BTreeMap;

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_till, take_while, take_while1};
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, not_line_ending, one_of, satisfy};
use nom::combinator::{map, not, opt, peek, recognize, value};
use nom::error::{ErrorKind, ParseError as NomParseError};
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};

use super::errors::ParseError;
use super::optimizer::{ArithmeticOp, CompareOp, FilterExpr};
use super::triple_pattern::{PatternTerm, TriplePattern};
use crate::node_maker::node::{
    OWL_NS, RDFS_NS, RDF_NS, RDF_TYPE, XSD_BOOLEAN, XSD_DECIMAL, XSD_DOUBLE, XSD_INTEGER, XSD_NS,
};
use crate::node_maker::Node;

/// Prefix declarations in scope. `rdf`, `rdfs`, `owl` and `xsd` are always
/// known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixes(BTreeMap<String, String>);

impl Default for Prefixes {
    fn default() -> Self {
        let builtins = [("rdf", RDF_NS), ("rdfs", RDFS_NS), ("owl", OWL_NS), ("xsd", XSD_NS)];
        Prefixes(
            builtins
                .into_iter()
                .map(|(p, ns)| (p.to_string(), ns.to_string()))
                .collect(),
        )
    }
}

impl Prefixes {
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.0.insert(prefix.into(), namespace.into());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    pub fn expand(&self, prefix: &str, local: &str) -> Option<String> {
        self.namespace(prefix).map(|ns| format!("{}{}", ns, local))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub prefixes: Prefixes,
    pub patterns: Vec<TriplePattern>,
    /// All FILTER clauses, conjoined.
    pub filter: Option<FilterExpr>,
}

/// Parses prefix declarations followed by triple patterns and filters.
pub fn parse_query(text: &str) -> Result<ParsedQuery, ParseError> {
    let (rest, declarations) = many0(ws(prefix_declaration))
        .parse(text)
        .map_err(|e| into_error("prefix declaration", e))?;
    let mut prefixes = Prefixes::default();
    for (prefix, namespace) in declarations {
        prefixes.insert(prefix, namespace);
    }

    let elements = finish("graph pattern", body(rest, &prefixes))?;
    let mut patterns = Vec::new();
    let mut filters = Vec::new();
    for element in elements {
        match element {
            Element::Triples(triples) => patterns.extend(triples),
            Element::Filter(filter) => filters.push(filter),
        }
    }
    log::trace!("Parsed {} triple pattern(s), {} filter(s)", patterns.len(), filters.len());
    Ok(ParsedQuery {
        prefixes,
        patterns,
        filter: FilterExpr::all(filters),
    })
}

/// Triple patterns only; a FILTER clause is a syntax error here.
pub fn parse_patterns(text: &str) -> Result<Vec<TriplePattern>, ParseError> {
    let query = parse_query(text)?;
    match query.filter {
        None => Ok(query.patterns),
        Some(filter) => Err(ParseError::TrailingInput {
            context: "triple patterns",
            rest: format!("FILTER {}", filter),
        }),
    }
}

/// A bare filter expression using the built-in prefixes.
pub fn parse_filter(text: &str) -> Result<FilterExpr, ParseError> {
    let prefixes = Prefixes::default();
    let result = finish("filter expression", ws(|i| expression(i, &prefixes)).parse(text));
    result
}

#[derive(Debug, PartialEq)]
enum SyntaxError<'a> {
    At(&'a str),
    UnknownPrefix(&'a str),
}

impl<'a> NomParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        SyntaxError::At(input)
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

fn into_error(context: &'static str, err: nom::Err<SyntaxError<'_>>) -> ParseError {
    match err {
        nom::Err::Error(SyntaxError::At(rest)) | nom::Err::Failure(SyntaxError::At(rest)) => {
            ParseError::Syntax {
                context,
                rest: excerpt(rest),
            }
        }
        nom::Err::Error(SyntaxError::UnknownPrefix(prefix))
        | nom::Err::Failure(SyntaxError::UnknownPrefix(prefix)) => {
            ParseError::UnknownPrefix(prefix.to_string())
        }
        nom::Err::Incomplete(_) => ParseError::Syntax {
            context,
            rest: String::new(),
        },
    }
}

fn finish<O>(context: &'static str, result: PResult<'_, O>) -> Result<O, ParseError> {
    let (rest, output) = result.map_err(|e| into_error(context, e))?;
    let (rest, _) = skip(rest).map_err(|e| into_error(context, e))?;
    if rest.is_empty() {
        Ok(output)
    } else {
        Err(ParseError::TrailingInput {
            context,
            rest: excerpt(rest),
        })
    }
}

fn excerpt(rest: &str) -> String {
    rest.chars().take(40).collect()
}

/// Whitespace and `#` comments.
fn skip(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((multispace1, recognize(pair(char('#'), not_line_ending))))),
    )
    .parse(input)
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = SyntaxError<'a>>
where
    F: Parser<&'a str, Output = O, Error = SyntaxError<'a>>,
{
    delimited(skip, inner, skip)
}

fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = SyntaxError<'a>> {
    terminated(
        tag_no_case(word),
        not(peek(satisfy(|c| is_name_char(c) || c == ':'))),
    )
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_prefix_char(c: char) -> bool {
    is_name_char(c) || c == '-'
}

fn prefix_declaration(input: &str) -> PResult<'_, (String, String)> {
    let (input, _) = keyword("PREFIX").parse(input)?;
    let (input, prefix) = ws(terminated(take_while(is_prefix_char), char(':'))).parse(input)?;
    let (input, namespace) = iri_ref(input)?;
    Ok((input, (prefix.to_string(), namespace.to_string())))
}

enum Element {
    Triples(Vec<TriplePattern>),
    Filter(FilterExpr),
}

fn body<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, Vec<Element>> {
    let (input, _) = opt(ws(keyword("WHERE"))).parse(input)?;
    alt((
        delimited(ws(char('{')), |i| elements(i, prefixes), ws(char('}'))),
        |i| elements(i, prefixes),
    ))
    .parse(input)
}

fn elements<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, Vec<Element>> {
    many0(terminated(
        alt((
            map(|i| filter_clause(i, prefixes), Element::Filter),
            map(|i| triples_block(i, prefixes), Element::Triples),
        )),
        opt(ws(char('.'))),
    ))
    .parse(input)
}

fn filter_clause<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    preceded(
        ws(keyword("FILTER")),
        ws(alt((
            delimited(ws(char('(')), |i| expression(i, prefixes), ws(char(')'))),
            |i| function_call(i, prefixes),
        ))),
    )
    .parse(input)
}

/// `subject verb objects (; verb objects)*` with `,` separating objects.
fn triples_block<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, Vec<TriplePattern>> {
    let (input, subject) = ws(|i| term(i, prefixes)).parse(input)?;
    let (input, groups) = separated_list1(
        ws(char(';')),
        pair(
            ws(|i| term(i, prefixes)),
            separated_list1(ws(char(',')), ws(|i| term(i, prefixes))),
        ),
    )
    .parse(input)?;

    let mut triples = Vec::new();
    for (predicate, objects) in groups {
        for object in objects {
            triples.push(TriplePattern::new(subject.clone(), predicate.clone(), object));
        }
    }
    Ok((input, triples))
}

fn term<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, PatternTerm> {
    alt((
        map(variable, PatternTerm::variable),
        map(|i| node(i, prefixes), PatternTerm::Node),
    ))
    .parse(input)
}

fn variable(input: &str) -> PResult<'_, &str> {
    preceded(one_of("?$"), take_while1(is_name_char)).parse(input)
}

fn node<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, Node> {
    alt((
        map(iri_ref, Node::uri),
        map(blank_node, Node::blank),
        map(keyword("a"), |_| Node::uri(RDF_TYPE)),
        |i| literal(i, prefixes),
        map(|i| prefixed_name(i, prefixes), Node::Uri),
    ))
    .parse(input)
}

fn iri_ref(input: &str) -> PResult<'_, &str> {
    delimited(
        char('<'),
        take_till(|c: char| c == '>' || c.is_whitespace()),
        char('>'),
    )
    .parse(input)
}

fn blank_node(input: &str) -> PResult<'_, &str> {
    preceded(tag("_:"), take_while1(is_prefix_char)).parse(input)
}

fn prefixed_name<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, String> {
    let (rest, prefix) = terminated(take_while(is_prefix_char), char(':')).parse(input)?;
    let (rest, local) = local_name(rest)?;
    match prefixes.expand(prefix, local) {
        Some(iri) => Ok((rest, iri)),
        None => Err(nom::Err::Failure(SyntaxError::UnknownPrefix(prefix))),
    }
}

/// Name characters and inner dots; a trailing dot ends the triple.
fn local_name(input: &str) -> PResult<'_, &str> {
    let end = input
        .char_indices()
        .take_while(|(_, c)| is_prefix_char(*c) || *c == '.')
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    let name = input[..end].trim_end_matches('.');
    Ok((&input[name.len()..], name))
}

fn literal<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, Node> {
    alt((
        |i| quoted_literal(i, prefixes),
        numeric_literal,
        map(keyword("true"), |_| Node::typed_literal("true", XSD_BOOLEAN)),
        map(keyword("false"), |_| Node::typed_literal("false", XSD_BOOLEAN)),
    ))
    .parse(input)
}

enum LiteralSuffix<'a> {
    Language(&'a str),
    Datatype(String),
}

fn quoted_literal<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, Node> {
    let (input, lexical) = quoted_string(input)?;
    let (input, suffix) = opt(alt((
        map(preceded(char('@'), language_tag), LiteralSuffix::Language),
        map(
            preceded(
                tag("^^"),
                alt((map(iri_ref, String::from), |i| prefixed_name(i, prefixes))),
            ),
            LiteralSuffix::Datatype,
        ),
    )))
    .parse(input)?;

    let node = match suffix {
        None => Node::plain_literal(lexical),
        Some(LiteralSuffix::Language(language)) => Node::lang_literal(lexical, language),
        Some(LiteralSuffix::Datatype(datatype)) => Node::typed_literal(lexical, datatype),
    };
    Ok((input, node))
}

fn language_tag(input: &str) -> PResult<'_, &str> {
    recognize(pair(alpha1, many0(pair(char('-'), alphanumeric1)))).parse(input)
}

fn quoted_string(input: &str) -> PResult<'_, String> {
    let (rest, quote) = one_of("\"'").parse(input)?;
    let mut lexical = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                lexical.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            '\n' | '\r' => break,
            c if c == quote => return Ok((&rest[i + c.len_utf8()..], lexical)),
            c => lexical.push(c),
        }
    }
    Err(nom::Err::Error(SyntaxError::from_error_kind(input, ErrorKind::Char)))
}

fn numeric_literal(input: &str) -> PResult<'_, Node> {
    let (rest, text) = recognize((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;

    let datatype = if text.contains(['e', 'E']) {
        XSD_DOUBLE
    } else if text.contains('.') {
        XSD_DECIMAL
    } else {
        XSD_INTEGER
    };
    Ok((rest, Node::typed_literal(text, datatype)))
}

fn expression<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    let (mut input, mut expr) = and_expression(input, prefixes)?;
    loop {
        match preceded(ws(tag("||")), |i| and_expression(i, prefixes)).parse(input) {
            Ok((rest, rhs)) => {
                expr = FilterExpr::or(expr, rhs);
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((input, expr))
}

fn and_expression<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    let (mut input, mut expr) = relational_expression(input, prefixes)?;
    loop {
        match preceded(ws(tag("&&")), |i| relational_expression(i, prefixes)).parse(input) {
            Ok((rest, rhs)) => {
                expr = FilterExpr::and(expr, rhs);
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((input, expr))
}

fn compare_op(input: &str) -> PResult<'_, CompareOp> {
    ws(alt((
        value(CompareOp::NotEqual, tag("!=")),
        value(CompareOp::LessOrEqual, tag("<=")),
        value(CompareOp::GreaterOrEqual, tag(">=")),
        value(CompareOp::Equal, tag("=")),
        value(CompareOp::Less, tag("<")),
        value(CompareOp::Greater, tag(">")),
    )))
    .parse(input)
}

fn relational_expression<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    let (input, lhs) = additive_expression(input, prefixes)?;
    match pair(compare_op, |i| additive_expression(i, prefixes)).parse(input) {
        Ok((rest, (op, rhs))) => Ok((rest, FilterExpr::compare(op, lhs, rhs))),
        Err(nom::Err::Error(_)) => Ok((input, lhs)),
        Err(e) => Err(e),
    }
}

fn additive_expression<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    let operator = ws(alt((
        value(ArithmeticOp::Add, char('+')),
        value(ArithmeticOp::Subtract, char('-')),
    )));
    arithmetic_chain(input, prefixes, operator, multiplicative_expression)
}

fn multiplicative_expression<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    let operator = ws(alt((
        value(ArithmeticOp::Multiply, char('*')),
        value(ArithmeticOp::Divide, char('/')),
    )));
    arithmetic_chain(input, prefixes, operator, unary_expression)
}

/// Left-associative `operand (op operand)*`.
fn arithmetic_chain<'a, P>(
    input: &'a str,
    prefixes: &Prefixes,
    mut operator: P,
    operand: fn(&'a str, &Prefixes) -> PResult<'a, FilterExpr>,
) -> PResult<'a, FilterExpr>
where
    P: Parser<&'a str, Output = ArithmeticOp, Error = SyntaxError<'a>>,
{
    let (mut input, mut expr) = operand(input, prefixes)?;
    loop {
        let (rest, op) = match operator.parse(input) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        };
        match operand(rest, prefixes) {
            Ok((rest, rhs)) => {
                expr = FilterExpr::Arithmetic(op, Box::new(expr), Box::new(rhs));
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((input, expr))
}

fn unary_expression<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    alt((
        map(
            preceded(ws(terminated(char('!'), not(peek(char('='))))), |i| {
                unary_expression(i, prefixes)
            }),
            FilterExpr::not,
        ),
        |i| primary_expression(i, prefixes),
    ))
    .parse(input)
}

fn primary_expression<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    ws(alt((
        delimited(ws(char('(')), |i| expression(i, prefixes), ws(char(')'))),
        |i| function_call(i, prefixes),
        map(variable, FilterExpr::variable),
        map(|i| node(i, prefixes), FilterExpr::Constant),
    )))
    .parse(input)
}

fn function_name<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, String> {
    alt((
        map(iri_ref, String::from),
        |i| prefixed_name(i, prefixes),
        map(
            recognize(pair(alpha1, take_while(is_name_char))),
            String::from,
        ),
    ))
    .parse(input)
}

fn function_call<'a>(input: &'a str, prefixes: &Prefixes) -> PResult<'a, FilterExpr> {
    let (rest, name) = terminated(|i| function_name(i, prefixes), peek(ws(char('(')))).parse(input)?;
    let (rest, args) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), |i| expression(i, prefixes)),
        ws(char(')')),
    )
    .parse(rest)?;
    match built_in(&name, args) {
        Some(expr) => Ok((rest, expr)),
        None => Err(nom::Err::Failure(SyntaxError::At(input))),
    }
}

/// The built-in for `name`, `None` on a wrong argument list.
fn built_in(name: &str, args: Vec<FilterExpr>) -> Option<FilterExpr> {
    let mut args = args.into_iter();
    let expr = match name.to_ascii_lowercase().as_str() {
        "bound" => match args.next() {
            Some(FilterExpr::Variable(v)) => FilterExpr::Bound(v),
            _ => return None,
        },
        "isiri" | "isuri" => FilterExpr::IsIri(Box::new(args.next()?)),
        "isblank" => FilterExpr::IsBlank(Box::new(args.next()?)),
        "isliteral" => FilterExpr::IsLiteral(Box::new(args.next()?)),
        "lang" => FilterExpr::Lang(Box::new(args.next()?)),
        "datatype" => FilterExpr::Datatype(Box::new(args.next()?)),
        "str" => FilterExpr::Str(Box::new(args.next()?)),
        "langmatches" => {
            let tag = args.next()?;
            FilterExpr::LangMatches(Box::new(tag), Box::new(args.next()?))
        }
        "sameterm" => {
            let a = args.next()?;
            FilterExpr::SameTerm(Box::new(a), Box::new(args.next()?))
        }
        "regex" => {
            let text = args.next()?;
            let pattern = args.next()?;
            let flags = args.next().map(Box::new);
            FilterExpr::Regex(Box::new(text), Box::new(pattern), flags)
        }
        _ => return Some(FilterExpr::Function(name.to_string(), args.collect())),
    };
    args.next().is_none().then_some(expr)
}
