//! Syntax tree for selector expressions.

/// A parsed selector: a pipeline of steps joined by `|`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// The selector text this expression was parsed from.
    pub source: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Path(Path),
    Function(FunctionCall),
}

/// A sequence of components. An empty path is the identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// `.name`
    Field(String),
    /// `[...]` with an index, slice, or quoted key
    Bracket(Bracket),
    /// `[]`
    Iterate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Bracket {
    /// `[2]`, `[-1]`
    Index(i64),
    /// `[a:b]`, `[:b]`, `[a:]`, `[:]`
    Slice { start: Option<i64>, end: Option<i64> },
    /// `["key"]` or `['key']`; never treated as an index
    Key(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<FuncArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FuncArg {
    Comparison(Comparison),
    Path(Path),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Path,
    pub op: CompareOp,
    pub right: Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(i64),
}

impl Literal {
    pub fn render(&self) -> String {
        match self {
            Literal::String(s) => s.clone(),
            Literal::Number(n) => n.to_string(),
        }
    }
}

impl Expression {
    /// Flatten the expression into a component list usable for direct writes.
    ///
    /// Returns `None` when the expression has more than one step, its only
    /// step is a function call, or any component iterates an array.
    pub fn simple_path(&self) -> Option<&[Component]> {
        match self.steps.as_slice() {
            [Step::Path(path)] => {
                if path.components.contains(&Component::Iterate) {
                    None
                } else {
                    Some(&path.components)
                }
            }
            _ => None,
        }
    }
}
