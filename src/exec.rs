use crate::context::*;
use crate::error::RenderError;
use crate::escape::encode;
use crate::scope::BlockKind;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A dotted path into the render context, e.g. `user.address.city`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Path {
    pub segments: Vec<String>,
}

impl Path {
    pub fn parse(path: &str) -> Self {
        Path {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Where a value comes from.
#[derive(PartialEq, Debug, Clone)]
pub enum Source {
    Path(Path),
    Literal(Value),
}

/// A value passed through a chain of helpers, applied left to right.
#[derive(PartialEq, Debug, Clone)]
pub struct Piped {
    pub source: Source,
    pub helpers: Vec<String>,
}

/// `{name key=value ...}`
#[derive(PartialEq, Debug, Clone)]
pub struct Call {
    pub function: String,
    pub arguments: Vec<(String, Source)>,
}

/// Condition of a conditional block.
#[derive(PartialEq, Debug, Clone)]
pub enum Test {
    Truthy(Piped),
    Falsy(Piped),
    Equals(Path, Source),
}

impl Test {
    pub fn kind(&self) -> BlockKind {
        match self {
            Test::Truthy(_) => BlockKind::If,
            Test::Falsy(_) => BlockKind::Unless,
            Test::Equals(..) => BlockKind::When,
        }
    }
}

/// `{each key => item, index in iterable}`. `key` is only set for mappings.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Loop {
    pub iterable: Path,
    pub key: Option<String>,
    pub item: String,
    pub index: String,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Inst {
    Text(String),
    Print(Piped),
    Call(Call),
    If(Test),
    Each(Loop),
    End(BlockKind),
}

// The executer that renders the template.
#[derive(Debug)]
pub struct Executer {
    insts: Vec<Inst>,

    // Tells where the instruction pointer jumps to.
    // - If, Each: where to go when the condition fails or there is nothing to iterate.
    // - End of Each: the first instruction of the loop body.
    jump_table: HashMap<usize, usize>,
}

impl Executer {
    pub fn new(insts: Vec<Inst>) -> Result<Self, String> {
        Ok(Executer {
            jump_table: Executer::compute_jump_table(&insts)?,
            insts,
        })
    }

    fn compute_jump_table(insts: &[Inst]) -> Result<HashMap<usize, usize>, String> {
        let mut jump_table = HashMap::new();
        let mut opened = Vec::new();

        for (inst_index, inst) in insts.iter().enumerate() {
            match inst {
                Inst::If(_) | Inst::Each(_) => opened.push(inst_index),
                Inst::End(kind) => {
                    let open_index = opened.pop().ok_or_else(|| {
                        format!("Unmatched end of {} at instruction {}", kind, inst_index)
                    })?;

                    match &insts[open_index] {
                        Inst::If(test) if test.kind() == *kind => {
                            jump_table.insert(open_index, inst_index + 1);
                        }
                        Inst::Each(_) if *kind == BlockKind::Each => {
                            jump_table.insert(open_index, inst_index + 1);
                            jump_table.insert(inst_index, open_index + 1);
                        }
                        open => {
                            return Err(format!(
                                "End of {} at instruction {} closes {:?}",
                                kind, inst_index, open
                            ))
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(open_index) = opened.pop() {
            return Err(format!(
                "No end found for {:?} at instruction {}",
                insts[open_index], open_index
            ));
        }

        Ok(jump_table)
    }

    pub fn insts(&self) -> &[Inst] {
        &self.insts
    }

    pub fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let mut rendered = String::new();

        let mut inst_index = 0;
        while let Some(inst) = self.insts.get(inst_index) {
            match inst {
                Inst::Text(text) => rendered.push_str(text),
                Inst::Print(piped) => {
                    rendered.push_str(&encode(&context.pipe(piped)?.to_str()));
                }
                Inst::Call(call) => {
                    rendered.push_str(&encode(&context.call(call)?.to_str()));
                }
                Inst::If(test) => {
                    // Jump only if the condition is false. Otherwise just go to next instruction.
                    if !context.test(test)? {
                        inst_index = self.jump(inst_index);
                        continue;
                    }
                }
                Inst::Each(each) => {
                    if !context.enter_loop(each)? {
                        inst_index = self.jump(inst_index);
                        continue;
                    }
                }
                Inst::End(BlockKind::Each) => {
                    if context.next_iteration() {
                        inst_index = self.jump(inst_index);
                        continue;
                    }
                }
                Inst::End(_) => {}
            }

            inst_index += 1;
        }

        Ok(rendered)
    }

    fn jump(&self, inst_index: usize) -> usize {
        self.jump_table
            .get(&inst_index)
            .copied()
            .unwrap_or(self.insts.len())
    }
}

#[cfg(test)]
fn truthy(path: &str) -> Test {
    Test::Truthy(Piped {
        source: Source::Path(Path::parse(path)),
        helpers: vec![],
    })
}

#[cfg(test)]
fn each(item: &str, iterable: &str) -> Loop {
    Loop {
        iterable: Path::parse(iterable),
        key: None,
        item: item.to_string(),
        index: "_index".to_string(),
    }
}

#[test]
fn test_if_jump_table() {
    let executer = Executer::new(vec![
        Inst::If(truthy("a")),
        Inst::Text("a".to_string()),
        Inst::End(BlockKind::If),
        Inst::Text("b".to_string()),
    ])
    .unwrap();

    assert_eq!(executer.jump_table, [(0, 3)].iter().cloned().collect())
}

#[test]
fn test_each_and_if_jump_table() {
    let executer = Executer::new(vec![
        Inst::Each(each("x", "xs")),
        Inst::If(truthy("x")),
        Inst::Text("a".to_string()),
        Inst::End(BlockKind::If),
        Inst::End(BlockKind::Each),
    ])
    .unwrap();

    assert_eq!(
        executer.jump_table,
        [(0, 5), (1, 4), (4, 1)].iter().cloned().collect()
    )
}

#[test]
fn test_unbalanced_instructions() {
    assert!(Executer::new(vec![Inst::End(BlockKind::If)]).is_err());
    assert!(Executer::new(vec![Inst::Each(each("x", "xs"))]).is_err());
    assert!(Executer::new(vec![Inst::If(truthy("a")), Inst::End(BlockKind::Each)]).is_err());
    assert!(Executer::new(vec![Inst::If(truthy("a")), Inst::End(BlockKind::Unless)]).is_err());
}

#[test]
fn test_render_nested_loops() {
    let executer = Executer::new(vec![
        Inst::Each(each("row", "rows")),
        Inst::Each(each("cell", "row")),
        Inst::Print(Piped {
            source: Source::Path(Path::parse("cell")),
            helpers: vec![],
        }),
        Inst::End(BlockKind::Each),
        Inst::Text(";".to_string()),
        Inst::End(BlockKind::Each),
    ])
    .unwrap();

    let data = serde_json::json!({ "rows": [[1, 2], [], [3]] });
    let helpers = Helpers::new();

    assert_eq!(
        executer
            .render(&mut Context::new(&data, &helpers))
            .unwrap(),
        "12;;3;"
    );
}
