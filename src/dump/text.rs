use crate::{
    dump::{
        declaration::{banner, placeholder_typedefs, DeclarationWriter},
        ClassDump, Node, Visitor,
    },
    Result,
};

/// Renders a whole dump into one stream.
///
/// The stream holds the banner, the placeholder typedefs, every structure definition of
/// the image, then the declarations in output order.
#[derive(Debug, Default)]
pub struct TextVisitor {
    out: String,
}

impl TextVisitor {
    /// Create a visitor with an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The text written so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.out
    }

    /// Take the rendered text
    #[must_use]
    pub fn into_text(self) -> String {
        self.out
    }

    fn push_block(&mut self, block: &str) {
        if block.is_empty() {
            return;
        }
        self.out.push_str(block);
        if !block.ends_with("\n\n") {
            self.out.push('\n');
        }
    }
}

impl Visitor for TextVisitor {
    fn visit(&mut self, dump: &ClassDump, node: Node<'_>) -> Result<()> {
        let writer = DeclarationWriter::new(dump.registry(), dump.config());
        match node {
            Node::Header => {
                if dump.config().show_header {
                    self.push_block(&banner(dump.image_name()));
                }
                self.push_block(&placeholder_typedefs(dump.registry().placeholders()));
            }
            Node::Structures => {
                let ids: Vec<usize> = dump.registry().entries().iter().map(|e| e.id).collect();
                self.push_block(&writer.structures(&ids, &mut ())?);
            }
            Node::Protocol(protocol) => self.push_block(&writer.protocol(protocol, &mut ())?),
            Node::Class(class) => self.push_block(&writer.class(class, &mut ())?),
            Node::Category(category) => self.push_block(&writer.category(category, &mut ())?),
        }
        Ok(())
    }
}
