use crate::TreeFloat;
use crate::parsers::TreeParseError;
use crate::phylo::node::NodeId;
use crate::phylo::tree::Tree;

/// Parses every `;`-terminated Newick tree in `s`.
///
/// This is the driver-side collaborator of the analysis core: it produces the
/// abstract rooted tree the core consumes, nothing more. Labels are kept
/// verbatim (quoted labels are unquoted, `''` unescaped), branch lengths
/// follow `:`, polytomies are allowed, and bracket comments such as the
/// `[&R]`/`[&U]` rooting markers are skipped.
pub fn parse_newick(s: &str) -> Result<Vec<Tree>, TreeParseError> {
    let mut parser = NewickParser { bytes: s.as_bytes(), pos: 0 };
    let mut trees: Vec<Tree> = Vec::new();
    loop {
        parser.skip_filler();
        if parser.at_end() {
            break;
        }
        trees.push(parser.tree()?);
    }
    if trees.is_empty() {
        return Err(TreeParseError::Empty);
    }
    Ok(trees)
}

struct NewickParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl NewickParser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self, found: u8) -> TreeParseError {
        TreeParseError::Unexpected { found: found as char, at: self.pos }
    }

    /// Skips whitespace and `[...]` comments.
    fn skip_filler(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.bump();
            } else if c == b'[' {
                while let Some(c) = self.peek() {
                    self.bump();
                    if c == b']' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn tree(&mut self) -> Result<Tree, TreeParseError> {
        let mut tree = Tree::new();
        self.subtree(&mut tree, None)?;
        self.skip_filler();
        match self.peek() {
            Some(b';') => self.bump(),
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(TreeParseError::UnexpectedEnd),
        }
        tree.validate()?;
        Ok(tree)
    }

    fn subtree(
        &mut self,
        tree: &mut Tree,
        parent: Option<NodeId>,
    ) -> Result<NodeId, TreeParseError> {
        self.skip_filler();
        let node_id = tree.add_new_node(None, None, parent)?;
        if self.peek() == Some(b'(') {
            self.bump();
            loop {
                self.subtree(tree, Some(node_id))?;
                self.skip_filler();
                match self.peek() {
                    Some(b',') => self.bump(),
                    Some(b')') => {
                        self.bump();
                        break;
                    }
                    Some(c) => return Err(self.unexpected(c)),
                    None => return Err(TreeParseError::UnexpectedEnd),
                }
            }
        }
        self.skip_filler();
        let name = self.label()?;
        if !name.is_empty()
            && let Some(node) = tree.node_mut(Some(node_id))
        {
            node.set_name(Some(&name));
        }
        self.skip_filler();
        if self.peek() == Some(b':') {
            self.bump();
            let branch_length = self.number()?;
            if let Some(node) = tree.node_mut(Some(node_id)) {
                node.set_branch_length(Some(branch_length));
            }
        }
        Ok(node_id)
    }

    fn label(&mut self) -> Result<String, TreeParseError> {
        if self.peek() == Some(b'\'') {
            self.bump();
            let mut label: Vec<u8> = Vec::new();
            loop {
                match self.peek() {
                    Some(b'\'') => {
                        self.bump();
                        // '' inside a quoted label is an escaped quote
                        if self.peek() == Some(b'\'') {
                            self.bump();
                            label.push(b'\'');
                        } else {
                            return Ok(String::from_utf8_lossy(&label)
                                .into_owned());
                        }
                    }
                    Some(c) => {
                        self.bump();
                        label.push(c);
                    }
                    None => return Err(TreeParseError::UnexpectedEnd),
                }
            }
        } else {
            let start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_ascii_whitespace() || b"(),:;[]'".contains(&c) {
                    break;
                }
                self.bump();
            }
            Ok(String::from_utf8_lossy(&self.bytes[start..self.pos])
                .into_owned())
        }
    }

    fn number(&mut self) -> Result<TreeFloat, TreeParseError> {
        self.skip_filler();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || b"+-.eE".contains(&c) {
                self.bump();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default();
        text.parse::<TreeFloat>()
            .map_err(|_| TreeParseError::BadNumber(start))
    }
}

/// Writes `tree` back out as a `;`-terminated Newick string. Labels that
/// contain Newick metacharacters are single-quoted with `''` escapes.
pub fn write_newick(tree: &Tree) -> String {
    let mut out = String::new();
    if let Some(first_node_id) = tree.first_node_id() {
        write_node(tree, first_node_id, &mut out);
    }
    out.push(';');
    out
}

fn write_node(tree: &Tree, node_id: NodeId, out: &mut String) {
    let child_ids = tree.child_ids(&node_id);
    if !child_ids.is_empty() {
        out.push('(');
        for (i, child_id) in child_ids.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_node(tree, *child_id, out);
        }
        out.push(')');
    }
    if let Some(name) = tree.label(&node_id) {
        out.push_str(&quote_label(&name));
    }
    if let Some(branch_length) = tree.branch_length(node_id) {
        out.push_str(&format!(":{branch_length}"));
    }
}

pub(crate) fn quote_label(label: &str) -> String {
    let needs_quoting = label
        .chars()
        .any(|c| c.is_whitespace() || "()[]{}:;,'".contains(c));
    if needs_quoting {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
