use super::error::TreeError;
use super::node::NodeId;
use super::tree::Tree;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::many0,
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};

// ================================================================================================
// Error Handling Structures
// ================================================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum DetailedErrorKind {
    Context(&'static str),
    Nom(ErrorKind),
}

/// A nom error that accumulates context, for line/column reporting.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailedError<'a> {
    pub errors: Vec<(&'a str, DetailedErrorKind)>,
}

impl<'a> ParseError<&'a str> for DetailedError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for DetailedError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DetailedError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }
}

// ================================================================================================
// Intermediate Structure
// ================================================================================================

/// Recursive node produced by the parser, flattened into the `Tree` arena afterwards.
#[derive(Debug, Default)]
struct ParsedNode {
    name: Option<String>,
    length: Option<f64>,
    children: Vec<ParsedNode>,
}

impl ParsedNode {
    /// Moves this node and its descendants into `tree`, returning the new root ID.
    /// Uses an explicit stack; children keep their input order.
    fn into_tree(self, tree: &mut Tree) -> NodeId {
        let root = tree.add_node();
        let mut stack = vec![(self, root)];

        while let Some((mut parsed, id)) = stack.pop() {
            if let Some(node) = tree.get_node_mut(id) {
                node.name = parsed.name.take();
                node.length = parsed.length;
            }
            for child in std::mem::take(&mut parsed.children) {
                let child_id = tree.add_node();
                // Both IDs were just created, and the child has no parent yet
                let _ = tree.add_child(id, child_id);
                stack.push((child, child_id));
            }
        }

        root
    }
}

impl Drop for ParsedNode {
    // Flattens before dropping; the derived drop recurses once per level
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

// ================================================================================================
// Parsers
// ================================================================================================

// Wraps another parser and ignores surrounding whitespace
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// Unquoted labels stop at reserved characters; quoted labels use '' or "" as escapes.
fn parse_label(input: &str) -> IResult<&str, String, DetailedError<'_>> {
    let unquoted = map(take_while(|c: char| !"():;,[]".contains(c)), |s: &str| {
        s.trim().to_string()
    });

    let single_quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );

    let double_quoted = delimited(
        char('"'),
        map(is_not("\""), |s: &str| s.replace("\"\"", "\"")),
        char('"'),
    );

    context("label", alt((single_quoted, double_quoted, unquoted))).parse(input)
}

// Branch length after a colon, e.g. ":0.123" or ":1e-3"
fn parse_length(input: &str) -> IResult<&str, f64, DetailedError<'_>> {
    context(
        "length",
        preceded(
            ws(char(':')),
            cut(map_res(
                recognize((
                    opt(char('-')),
                    digit1,
                    opt((char('.'), digit1)),
                    opt((
                        alt((char('e'), char('E'))),
                        opt(alt((char('+'), char('-')))),
                        digit1,
                    )),
                )),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

// Bracket comments carry nothing the reconciliation needs; they are skipped.
fn skip_comments(input: &str) -> IResult<&str, (), DetailedError<'_>> {
    map(
        many0(ws(delimited(char('['), take_while(|c| c != ']'), char(']')))),
        |_| (),
    )
    .parse(input)
}

fn punct<'a>(c: char) -> impl Parser<&'a str, Output = char, Error = DetailedError<'a>> {
    ws(char(c))
}

// Label:Length after the children of a node, with optional comments around the length
fn parse_tail(
    input: &str,
    children: Vec<ParsedNode>,
) -> IResult<&str, ParsedNode, DetailedError<'_>> {
    let (input, label) = opt(parse_label).parse(input)?;
    let (input, _) = skip_comments(input)?;
    let (input, length) = opt(parse_length).parse(input)?;
    let (input, _) = skip_comments(input)?;

    let node = ParsedNode {
        name: label.filter(|l| !l.is_empty()),
        length,
        children,
    };

    Ok((input, node))
}

// (child1,child2,...)Label:Length
//
// Open parentheses live on an explicit stack, so nesting depth is bounded by
// memory rather than by the call stack.
fn parse_subtree(input: &str) -> IResult<&str, ParsedNode, DetailedError<'_>> {
    // children parsed so far under each unclosed '('
    let mut open: Vec<Vec<ParsedNode>> = Vec::new();
    let mut input = input;

    loop {
        while let Ok((rest, _)) = punct('(').parse(input) {
            open.push(Vec::new());
            input = rest;
        }

        let (rest, mut node) = parse_tail(input, Vec::new())?;
        input = rest;

        loop {
            let Some(siblings) = open.last_mut() else {
                return Ok((input, node));
            };
            siblings.push(node);

            if let Ok((rest, _)) = punct(',').parse(input) {
                input = rest;
                break;
            }

            let (rest, _) = context("children", punct(')')).parse(input)?;
            let children = open.pop().unwrap_or_default();
            let (rest, parent) = parse_tail(rest, children)?;
            input = rest;
            node = parent;
        }
    }
}

fn build_tree(root_node: ParsedNode) -> Tree {
    let mut tree = Tree::new();
    let root_id = root_node.into_tree(&mut tree);
    tree.set_root(root_id);
    tree
}

// ================================================================================================
// Entry Points
// ================================================================================================

/// Parses a single Newick tree string, which must end with ';'.
pub fn parse_newick(input: &str) -> Result<Tree, TreeError> {
    let (tree, rest) = parse_newick_prefix(input)?;
    if !rest.trim().is_empty() {
        return Err(make_tree_error(
            input,
            DetailedError {
                errors: vec![(rest, DetailedErrorKind::Context("end of input"))],
            },
        ));
    }
    Ok(tree)
}

/// Parses one tree terminated by ';' from the start of `input` and returns
/// the unconsumed remainder. Error positions are relative to `input`.
pub fn parse_newick_prefix(input: &str) -> Result<(Tree, &str), TreeError> {
    let mut parser = (ws(parse_subtree), ws(char(';')));

    match parser.parse(input) {
        Ok((rest, (root_node, _))) => Ok((build_tree(root_node), rest)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(TreeError::ParseError {
            message: "Incomplete input".to_string(),
            line: 0,
            column: 0,
            snippet: "".to_string(),
        }),
    }
}

// Convert nom errors into TreeError with line/column of the innermost failure
fn make_tree_error(input: &str, e: DetailedError) -> TreeError {
    let remaining = e.errors.first().map(|(r, _)| *r).unwrap_or(input);
    let offset = input.offset(remaining);

    let prefix = &input[..offset];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let last_newline = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = offset - last_newline + 1;

    let mut msg = String::new();
    for (_, kind) in e.errors.iter().rev() {
        match kind {
            DetailedErrorKind::Context(ctx) => {
                msg.push_str(&format!("while parsing {}:\n", ctx));
            }
            DetailedErrorKind::Nom(k) => {
                msg.push_str(&format!("  error: {:?}\n", k));
            }
        }
    }

    TreeError::ParseError {
        message: msg,
        line,
        column,
        snippet: remaining.chars().take(50).collect(),
    }
}

impl Tree {
    /// Parse a Newick string into a Tree.
    ///
    /// # Example
    /// ```
    /// use cophy::libs::phylo::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(h1,h2)m1;").unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// assert!(Tree::from_newick("(h1,h2:x)m1;").is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Self, TreeError> {
        parse_newick(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_simple() {
        let tree = Tree::from_newick("(A,B)C;").unwrap();
        assert_eq!(tree.len(), 3);

        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.name.as_deref(), Some("C"));
        assert_eq!(root.children.len(), 2);

        let c0 = tree.get_node(root.children[0]).unwrap();
        assert_eq!(c0.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_parser_lengths_and_comments() {
        let input = "(A:0.1[note], B:0.2e-1)Root:100;";
        let tree = Tree::from_newick(input).unwrap();

        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.name.as_deref(), Some("Root"));
        assert_eq!(root.length, Some(100.0));

        let child2 = tree.get_node(root.children[1]).unwrap();
        assert_eq!(child2.name.as_deref(), Some("B"));
        assert_eq!(child2.length, Some(0.02));
    }

    #[test]
    fn test_parser_multiline_whitespace() {
        let input = "
        (
            (p1 , p2) q1,
            'p 3'
        ) q0 ;
        ";
        let tree = Tree::from_newick(input).unwrap();
        assert_eq!(tree.len(), 5);
        let names: Vec<_> = (0..tree.len())
            .filter_map(|id| tree.get_node(id).and_then(|n| n.name.clone()))
            .collect();
        assert!(names.contains(&"p 3".to_string()));
        assert!(names.contains(&"q1".to_string()));
    }

    #[test]
    fn test_parser_prefix() {
        let input = "(h1,h2)m1;\n(p1,p2)q1;\np1:h1\n";
        let (host, rest) = parse_newick_prefix(input).unwrap();
        assert_eq!(host.len(), 3);
        let (parasite, rest) = parse_newick_prefix(rest).unwrap();
        assert_eq!(parasite.len(), 3);
        assert_eq!(rest.trim(), "p1:h1");
    }

    #[test]
    fn test_parser_error() {
        // Missing semicolon: expected at column 7
        let res = Tree::from_newick("(A,B)C");
        match res {
            Err(TreeError::ParseError { line, column, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 7);
            }
            _ => panic!("Expected ParseError, got {:?}", res),
        }

        let res2 = Tree::from_newick("(A,B:invalid)C;");
        match res2 {
            Err(TreeError::ParseError { message, .. }) => {
                assert!(message.contains("length"));
            }
            _ => panic!("Expected ParseError, got {:?}", res2),
        }

        // Trailing garbage after the tree
        assert!(Tree::from_newick("(A,B)C; (D,E)F;").is_err());
    }
}
