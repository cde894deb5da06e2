use crate::{
    dump::{
        declaration::{category_line, class_line, protocol_line, DeclarationWriter},
        ClassDump, Method, Node, Visitor,
    },
    typesystem::TypeFormatter,
    Result,
};

/// Lists the methods whose selector contains a search string.
///
/// Each match is written inside its owning declaration, so the output reads like a
/// trimmed down combined dump. Declarations without a match are skipped.
#[derive(Debug)]
pub struct FindMethodVisitor {
    search: String,
    out: String,
}

impl FindMethodVisitor {
    /// Create a visitor searching for `search`
    pub fn new(search: impl Into<String>) -> Self {
        FindMethodVisitor {
            search: search.into(),
            out: String::new(),
        }
    }

    /// Take the rendered text
    #[must_use]
    pub fn into_text(self) -> String {
        self.out
    }

    fn find(
        &mut self,
        dump: &ClassDump,
        context: String,
        groups: &[(char, &[Method])],
    ) -> Result<()> {
        let writer = DeclarationWriter::new(dump.registry(), dump.config());
        let mut delegate = ();
        let mut formatter = TypeFormatter::new(dump.registry(), &mut delegate);

        let mut lines = Vec::new();
        for (kind, methods) in groups {
            for method in methods.iter().filter(|m| m.name.contains(&self.search)) {
                lines.push(writer.method(&mut formatter, *kind, method)?);
            }
        }
        if lines.is_empty() {
            return Ok(());
        }

        self.out.push_str(&context);
        self.out.push('\n');
        for line in lines {
            self.out.push_str(&line);
            self.out.push('\n');
        }
        self.out.push_str("@end\n\n");
        Ok(())
    }
}

impl Visitor for FindMethodVisitor {
    fn visit(&mut self, dump: &ClassDump, node: Node<'_>) -> Result<()> {
        match node {
            Node::Header | Node::Structures => Ok(()),
            Node::Protocol(protocol) => self.find(
                dump,
                protocol_line(protocol),
                &[
                    ('+', protocol.class_methods.as_slice()),
                    ('-', protocol.instance_methods.as_slice()),
                    ('+', protocol.optional_class_methods.as_slice()),
                    ('-', protocol.optional_instance_methods.as_slice()),
                ],
            ),
            Node::Class(class) => self.find(
                dump,
                class_line(class),
                &[('+', class.class_methods.as_slice()), ('-', class.instance_methods.as_slice())],
            ),
            Node::Category(category) => self.find(
                dump,
                category_line(category),
                &[
                    ('+', category.class_methods.as_slice()),
                    ('-', category.instance_methods.as_slice()),
                ],
            ),
        }
    }
}
