//! Destination URL templates
//!
//! A template is a URL with zero or more unnamed `{}` placeholders. Literal braces are written
//! doubled (`{{` and `}}`). Anything inside a placeholder, like a name, an index or a format
//! spec, is rejected: only positional substitution is supported.

use thiserror::Error;

/// Template could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidTemplate {
    /// A placeholder with a name or an index
    #[error(r#"must not have keyword arguments ("{0}")"#)]
    NamedPlaceholder(String),

    /// An unnamed placeholder with a conversion or format spec, like `{:>10}`
    #[error(r#"must not have a format spec ("{{{0}}}")"#)]
    FormatSpec(String),

    /// A `{` without a closing `}`
    #[error("unclosed placeholder at position {0}")]
    Unclosed(usize),

    /// A single `}` outside of a placeholder
    #[error("single '}}' encountered at position {0}")]
    UnmatchedClose(usize),
}

/// Template could not be filled in
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// Stored template no longer parses
    #[error(transparent)]
    Template(#[from] InvalidTemplate),

    /// Less arguments than placeholders
    #[error("template needs {expected} arguments, got {supplied}")]
    MissingArguments {
        /// Placeholders in the template
        expected: usize,

        /// Arguments given
        supplied: usize,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder,
}

/// A parsed URL template
#[derive(Debug)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template
    pub fn parse(template: &str) -> Result<Self, InvalidTemplate> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((position, ch)) = chars.next() {
            match ch {
                '{' if chars.next_if(|(_, next)| *next == '{').is_some() => literal.push('{'),
                '}' if chars.next_if(|(_, next)| *next == '}').is_some() => literal.push('}'),
                '}' => return Err(InvalidTemplate::UnmatchedClose(position)),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, ch)) => name.push(ch),
                            None => return Err(InvalidTemplate::Unclosed(position)),
                        }
                    }

                    let (field, spec) = name
                        .split_once([':', '!'])
                        .unwrap_or((name.as_str(), ""));
                    if !field.is_empty() {
                        return Err(InvalidTemplate::NamedPlaceholder(field.to_string()));
                    }
                    if !spec.is_empty() {
                        return Err(InvalidTemplate::FormatSpec(name));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder);
                }
                ch => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Number of positional placeholders
    pub fn arity(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| **segment == Segment::Placeholder)
            .count()
    }

    /// Substitute the arguments left to right
    ///
    /// Extra arguments are ignored, missing ones are an error.
    pub fn format<A>(&self, arguments: &[A]) -> Result<String, FormatError>
    where
        A: AsRef<str>,
    {
        let expected = self.arity();
        if arguments.len() < expected {
            return Err(FormatError::MissingArguments {
                expected,
                supplied: arguments.len(),
            });
        }

        let mut arguments = arguments.iter();
        let mut formatted = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => formatted.push_str(literal),
                Segment::Placeholder => {
                    if let Some(argument) = arguments.next() {
                        formatted.push_str(argument.as_ref());
                    }
                }
            }
        }

        Ok(formatted)
    }
}

/// Count the positional arguments of a URL template
pub fn count_positional_args(url: &str) -> Result<usize, InvalidTemplate> {
    Template::parse(url).map(|template| template.arity())
}

/// Parse and fill in a template in one go
pub fn format_url<A>(template: &str, arguments: &[A]) -> Result<String, FormatError>
where
    A: AsRef<str>,
{
    Template::parse(template)?.format(arguments)
}
