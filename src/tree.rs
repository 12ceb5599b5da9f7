//! Parse trees as encoded by the runtime's `LarkEncoder`.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Tree { data: String, children: Vec<ParseNode> },
    Token { type_name: String, value: String },
    /// Tokens are `str` subclasses, so the encoder usually emits them as
    /// bare strings.
    Text(String),
    /// A `None` child, as produced with `maybe_placeholders`.
    Placeholder,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Tagged {
    Tree { data: String, children: Vec<Raw> },
    Token { type_name: String, value: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Tagged(Tagged),
    Text(String),
    Placeholder,
}

impl From<Raw> for ParseNode {
    fn from(raw: Raw) -> Self {
        match raw {
            Raw::Tagged(Tagged::Tree { data, children }) => ParseNode::Tree {
                data,
                children: children.into_iter().map(ParseNode::from).collect(),
            },
            Raw::Tagged(Tagged::Token { type_name, value }) => {
                ParseNode::Token { type_name, value }
            }
            Raw::Text(s) => ParseNode::Text(s),
            Raw::Placeholder => ParseNode::Placeholder,
        }
    }
}

impl ParseNode {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Raw>(content).map(ParseNode::from)
    }

    pub fn pretty(&self) -> termtree::Tree<String> {
        use ansi_term::Color::*;

        match self {
            ParseNode::Tree { data, children } => {
                termtree::Tree::new(Cyan.bold().paint(data).to_string())
                    .with_leaves(children.iter().map(|c| c.pretty()))
            }
            ParseNode::Token { type_name, value } => termtree::Tree::new(format!(
                "{} {}",
                Purple.paint(type_name),
                Yellow.paint(format!("{:?}", value))
            )),
            ParseNode::Text(s) => {
                termtree::Tree::new(Yellow.paint(format!("{:?}", s)).to_string())
            }
            ParseNode::Placeholder => {
                termtree::Tree::new(Fixed(8).paint("None").to_string())
            }
        }
    }

    /// Plain-text rendering, without terminal colors.
    pub fn plain(&self) -> termtree::Tree<String> {
        match self {
            ParseNode::Tree { data, children } => termtree::Tree::new(data.clone())
                .with_leaves(children.iter().map(|c| c.plain())),
            ParseNode::Token { type_name, value } => {
                termtree::Tree::new(format!("{} {:?}", type_name, value))
            }
            ParseNode::Text(s) => termtree::Tree::new(format!("{:?}", s)),
            ParseNode::Placeholder => termtree::Tree::new("None".to_owned()),
        }
    }
}
