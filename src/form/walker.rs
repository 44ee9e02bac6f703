//! Field tree traversal with an explicit work queue.
//!
//! An incremental update is append-only: once an object's body is finished nothing may be added
//! to it, and no two bodies may interleave. The walker therefore works in two phases per object:
//!
//! 1. While an object is being written, everything it refers to is decided: inline kids get
//!    fresh ids, appearance streams are planned. The object is then finished.
//! 2. The objects discovered in phase 1 are pushed onto a LIFO queue of [`Task`]s, children in
//!    reverse so that they pop in source order. Each task writes exactly one complete object.
//!
//! The result is the same depth-first order a recursive traversal would produce, with
//! "parent before child" holding by construction.

use std::collections::HashSet;

use tracing::{trace, warn};

use crate::{
    form::{
        appearance::{write_appearance_entry, Appearance, AppearanceBuilder},
        field::{partial_name, Inherited},
        options::FillOptions,
        report::FillReport,
        request::FillRequest,
        rewrite::start_rewrite,
    },
    pdf::{Dictionary, Document, IncrementalWriter, Name, ObjectId, Value},
    Error::RecursionLimit,
    Result,
};

/// A normalized kid: an existing reference, or an inline dictionary promoted to a fresh id.
#[derive(Clone, Debug, PartialEq)]
pub struct KidRef {
    /// The id the kid is written under
    pub id: ObjectId,
    /// The inline dictionary, if the kid was promoted
    pub promoted: Option<Value>,
}

/// What a widget kid of a filled field receives.
#[derive(Clone, Debug)]
pub enum WidgetUpdate {
    /// Set `/AS` to the given state
    State(Name),
    /// Point `/AP` at a regenerated appearance, then write it
    Appearance(Appearance),
}

/// One complete object write.
#[derive(Clone, Debug)]
pub enum Task {
    /// Visit a field tree node
    Field {
        /// Object id of the node
        id: ObjectId,
        /// The node's dictionary
        node: Value,
        /// Fully-qualified name of the parent, followed by a dot
        prefix: String,
        /// Attributes in effect at the parent
        inherited: Inherited,
        /// Depth below the AcroForm `/Fields`
        depth: usize,
    },
    /// Rewrite a widget kid of a filled field
    Widget {
        /// Object id of the widget
        id: ObjectId,
        /// The widget's dictionary
        node: Value,
        /// The change to apply
        update: WidgetUpdate,
    },
    /// Write a planned appearance stream
    Appearance(Appearance),
}

/// Walks the field tree of one document and writes the filled form.
pub struct Walker<'w, 'a> {
    pub(super) doc: &'w Document<'a>,
    pub(super) request: &'w FillRequest,
    pub(super) writer: IncrementalWriter,
    pub(super) appearances: AppearanceBuilder,
    pub(super) report: FillReport,
    max_depth: usize,
    queue: Vec<Task>,
    matched: HashSet<String>,
}

impl<'w, 'a> Walker<'w, 'a> {
    /// Create a walker writing into `writer`.
    ///
    /// # Errors
    /// Returns an error if the AcroForm's `/DR` cannot be resolved.
    pub fn new(
        doc: &'w Document<'a>,
        writer: IncrementalWriter,
        request: &'w FillRequest,
        options: &FillOptions,
        acroform: &Dictionary,
    ) -> Result<Self> {
        Ok(Walker {
            doc,
            request,
            writer,
            appearances: AppearanceBuilder::new(doc, acroform, options.text.clone())?,
            report: FillReport::default(),
            max_depth: options.max_depth,
            queue: Vec::new(),
            matched: HashSet::new(),
        })
    }

    /// The writer, for objects written before the form.
    pub fn writer_mut(&mut self) -> &mut IncrementalWriter {
        &mut self.writer
    }

    /// Write the AcroForm dictionary as object `id`, then the whole field tree.
    ///
    /// # Errors
    /// Returns an error if the tree is malformed, too deep, or an object cannot be read.
    pub fn write_form(&mut self, id: ObjectId, acroform: &Dictionary) -> Result<()> {
        self.writer.start_object(id)?;
        start_rewrite(&mut self.writer, acroform, &["Fields"])?;

        let fields = self.doc.resolve_key(acroform, "Fields")?;
        match fields {
            Some(fields) => {
                let inherited = Inherited::from_form(self.doc, acroform)?;
                self.writer.write_key("Fields")?;
                let kids = self.write_kids(fields.expect_array()?)?;
                self.writer.end_dictionary()?;
                self.writer.end_object()?;

                let tasks = kids
                    .into_iter()
                    .map(|kid| -> Result<Task> {
                        Ok(Task::Field {
                            id: kid.id,
                            node: self.load(&kid)?,
                            prefix: String::new(),
                            inherited: inherited.clone(),
                            depth: 0,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.schedule(tasks);
            }
            None => {
                self.writer.end_dictionary()?;
                self.writer.end_object()?;
            }
        }

        self.drain()
    }

    /// Write the shared font, compute unmatched names and finish the update.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if an object is still open.
    pub fn finish(mut self) -> Result<(Vec<u8>, FillReport)> {
        self.appearances.write_font(&mut self.writer)?;

        let mut unmatched: Vec<String> = self
            .request
            .names()
            .filter(|name| !self.matched.contains(*name))
            .map(str::to_string)
            .collect();
        unmatched.sort_unstable();
        self.report.unmatched = unmatched;

        let output = self.writer.finish()?;
        Ok((output, self.report))
    }

    /// Queue tasks so that they run in the given order.
    pub(super) fn schedule(&mut self, tasks: Vec<Task>) {
        self.queue.extend(tasks.into_iter().rev());
    }

    /// Load a kid's dictionary.
    pub(super) fn load(&self, kid: &KidRef) -> Result<Value> {
        match &kid.promoted {
            Some(value) => Ok(value.clone()),
            None => self.doc.get(kid.id),
        }
    }

    /// Write `kids` as an array of references into the open dictionary.
    ///
    /// Existing references are kept. Inline dictionaries receive fresh ids; their bodies are
    /// written later, after the open object has been finished. Other items are dropped.
    pub(super) fn write_kids(&mut self, kids: &[Value]) -> Result<Vec<KidRef>> {
        let mut refs = Vec::with_capacity(kids.len());
        self.writer.start_array()?;
        for kid in kids {
            if let Some(id) = kid.as_reference() {
                self.writer.copy_verbatim(kid)?;
                refs.push(KidRef { id, promoted: None });
            } else if kid.as_dict().is_some() {
                let id = self.writer.allocate_id();
                self.writer.write_reference(id)?;
                trace!(object = %id, "inline kid promoted");
                refs.push(KidRef {
                    id,
                    promoted: Some(kid.clone()),
                });
            } else {
                trace!(kind = kid.kind(), "kid dropped");
            }
        }
        self.writer.end_array()?;
        Ok(refs)
    }

    /// Start writing object `id`, rejecting a revisit.
    pub(super) fn start(&mut self, id: ObjectId) -> Result<()> {
        if self.writer.is_written(id.number) {
            return Err(malformed_error!("Field tree visits object {} twice", id));
        }
        self.writer.start_object(id)
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(task) = self.queue.pop() {
            if let Task::Field { id, .. } | Task::Widget { id, .. } = &task {
                // Shared kids and cycles: the first visit wins
                if self.writer.is_written(id.number) {
                    warn!(object = %id, "field tree reaches object again, skipped");
                    continue;
                }
            }
            match task {
                Task::Field {
                    id,
                    node,
                    prefix,
                    inherited,
                    depth,
                } => self.visit(id, &node, &prefix, &inherited, depth)?,
                Task::Widget { id, node, update } => self.write_widget(id, &node, update)?,
                Task::Appearance(appearance) => {
                    self.appearances.write(&mut self.writer, &appearance)?;
                }
            }
        }
        Ok(())
    }

    fn visit(
        &mut self,
        id: ObjectId,
        node: &Value,
        prefix: &str,
        inherited: &Inherited,
        depth: usize,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(RecursionLimit(self.max_depth));
        }
        let dict = node.expect_dict()?;
        let attributes = inherited.merge(self.doc, dict)?;
        let name = format!(
            "{prefix}{}",
            partial_name(self.doc, dict)?.unwrap_or_default()
        );
        trace!(object = %id, field = %name, depth, "visit");

        self.start(id)?;
        if let Some(value) = self.request.get(&name) {
            self.matched.insert(name.clone());
            return self.update_terminal(node, &name, &attributes, value);
        }

        start_rewrite(&mut self.writer, dict, &["Kids"])?;
        let Some(kids) = self.doc.resolve_key(dict, "Kids")? else {
            self.writer.end_dictionary()?;
            self.writer.end_object()?;
            return Ok(());
        };

        self.writer.write_key("Kids")?;
        let kids = self.write_kids(kids.expect_array()?)?;
        self.writer.end_dictionary()?;
        self.writer.end_object()?;

        let prefix = format!("{name}.");
        let tasks = kids
            .into_iter()
            .map(|kid| -> Result<Task> {
                Ok(Task::Field {
                    id: kid.id,
                    node: self.load(&kid)?,
                    prefix: prefix.clone(),
                    inherited: attributes.clone(),
                    depth: depth + 1,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.schedule(tasks);
        Ok(())
    }

    fn write_widget(&mut self, id: ObjectId, node: &Value, update: WidgetUpdate) -> Result<()> {
        let dict = node.expect_dict()?;
        self.start(id)?;
        match update {
            WidgetUpdate::State(state) => {
                start_rewrite(&mut self.writer, dict, &["AS"])?;
                self.writer.write_key("AS")?;
                self.writer.write_name_value(&state)?;
                self.writer.end_dictionary()?;
                self.writer.end_object()?;
            }
            WidgetUpdate::Appearance(appearance) => {
                start_rewrite(&mut self.writer, dict, &["AP"])?;
                write_appearance_entry(&mut self.writer, appearance.id)?;
                self.writer.end_dictionary()?;
                self.writer.end_object()?;
                self.schedule(vec![Task::Appearance(appearance)]);
            }
        }
        Ok(())
    }
}
