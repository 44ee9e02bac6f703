//! Writing a new value into a matched field.
//!
//! The behaviour depends on the field's resolved [`FieldKind`]. Buttons toggle appearance
//! states, text and choice fields get a new `/V` and a regenerated appearance, and kinds that
//! cannot hold a value are copied through unchanged.

use tracing::{debug, warn};

use crate::{
    form::{
        appearance::write_appearance_entry,
        field::{FieldKind, Inherited},
        request::FieldValue,
        rewrite::start_rewrite,
        states::widget_on_state,
        walker::{Task, Walker, WidgetUpdate},
    },
    pdf::{text::encode_text_string, Dictionary, Name, Object, Value},
    Result,
};

/// `true` if `value` is a text string equal to `text`.
fn is_text(value: &Object, text: &str) -> bool {
    value.as_string().is_some_and(|s| s.to_text() == text)
}

/// The text a choice field shows for `selected`.
///
/// When the options are `[export display]` pairs, the display string of the pair whose export
/// value matches is shown. Otherwise the value itself is shown.
fn choice_display(walker: &Walker<'_, '_>, inherited: &Inherited, selected: String) -> Result<String> {
    let Some(options) = inherited.options.as_ref().and_then(|options| options.as_array()) else {
        return Ok(selected);
    };
    for option in options {
        let option = walker.doc.resolve(option)?;
        let Some(pair) = option.as_array() else {
            continue;
        };
        let [export, display] = pair else {
            continue;
        };
        if !is_text(&walker.doc.resolve(export)?.object, &selected) {
            continue;
        }
        if let Some(display) = walker.doc.resolve(display)?.as_string() {
            return Ok(display.to_text());
        }
    }
    Ok(selected)
}

impl Walker<'_, '_> {
    /// Write `node` (already started) with `value`, dispatching on its kind.
    pub(super) fn update_terminal(
        &mut self,
        node: &Value,
        name: &str,
        inherited: &Inherited,
        value: &FieldValue,
    ) -> Result<()> {
        let dict = node.expect_dict()?;
        let kind = inherited.kind();
        match kind {
            FieldKind::CheckBox | FieldKind::Radio => {
                let selection = match kind {
                    FieldKind::Radio => value.selection(),
                    _ => value.selection().map(|_| 0),
                };
                self.update_button(dict, name, selection)?;
            }
            FieldKind::Text { rich } => self.update_text(dict, name, inherited, value, rich)?,
            FieldKind::Choice => self.update_choice(dict, name, inherited, value)?,
            FieldKind::PushButton | FieldKind::Signature | FieldKind::Unknown => {
                warn!(field = name, kind = ?kind, "field cannot hold a value, copied unchanged");
                self.writer.copy_verbatim(node)?;
                self.writer.end_object()?;
                self.report.skipped.push(name.to_string());
                return Ok(());
            }
        }

        debug!(field = name, kind = ?kind, "field filled");
        self.report.filled.push(name.to_string());
        Ok(())
    }

    fn on_state(&self, dict: &Dictionary, name: &str) -> Result<Name> {
        Ok(widget_on_state(self.doc, dict)?.unwrap_or_else(|| {
            warn!(field = name, "no on-state in appearance dictionary, using /Yes");
            Name::from("Yes")
        }))
    }

    fn update_button(&mut self, dict: &Dictionary, name: &str, selection: Option<usize>) -> Result<()> {
        let kids = match self.doc.resolve_key(dict, "Kids")? {
            Some(kids) if !dict.is_widget() => Some(kids.expect_array()?.to_vec()),
            _ => None,
        };

        let Some(kids) = kids else {
            let state = match selection {
                Some(_) => self.on_state(dict, name)?,
                None => Name::from("Off"),
            };
            start_rewrite(&mut self.writer, dict, &["V", "AS"])?;
            self.writer.write_key("V")?;
            self.writer.write_name_value(&state)?;
            self.writer.write_key("AS")?;
            self.writer.write_name_value(&state)?;
            self.writer.end_dictionary()?;
            return self.writer.end_object().map(|_| ());
        };

        start_rewrite(&mut self.writer, dict, &["V", "Kids"])?;
        self.writer.write_key("Kids")?;
        let refs = self.write_kids(&kids)?;
        let widgets = refs
            .iter()
            .map(|kid| self.load(kid))
            .collect::<Result<Vec<_>>>()?;

        let on = match selection {
            Some(index) if index < widgets.len() => {
                Some(self.on_state(widgets[index].expect_dict()?, name)?)
            }
            Some(index) => {
                warn!(field = name, index, kids = widgets.len(), "selection out of range, all kids set to /Off");
                None
            }
            None => None,
        };
        let off = Name::from("Off");

        self.writer.write_key("V")?;
        self.writer.write_name_value(on.as_ref().unwrap_or(&off))?;
        self.writer.end_dictionary()?;
        self.writer.end_object()?;

        let tasks = refs
            .into_iter()
            .zip(widgets)
            .enumerate()
            .map(|(index, (kid, widget))| {
                let state = match &on {
                    Some(on) if selection == Some(index) => on.clone(),
                    _ => off.clone(),
                };
                Task::Widget {
                    id: kid.id,
                    node: widget,
                    update: WidgetUpdate::State(state),
                }
            })
            .collect();
        self.schedule(tasks);
        Ok(())
    }

    fn update_text(
        &mut self,
        dict: &Dictionary,
        name: &str,
        inherited: &Inherited,
        value: &FieldValue,
        rich: bool,
    ) -> Result<()> {
        let (plain, rich_value) = match value {
            FieldValue::RichText { plain, rich } => (plain.clone(), rich.clone()),
            other => {
                let text = other.display_text();
                (text.clone(), text)
            }
        };

        self.write_with_appearance(dict, name, inherited, rich, &plain, |walker| {
            walker.writer.write_key("V")?;
            walker.writer.write_literal_string(&encode_text_string(&plain))?;
            if rich {
                walker.writer.write_key("RV")?;
                walker.writer.write_literal_string(&encode_text_string(&rich_value))?;
            }
            Ok(())
        })
    }

    fn update_choice(
        &mut self,
        dict: &Dictionary,
        name: &str,
        inherited: &Inherited,
        value: &FieldValue,
    ) -> Result<()> {
        let selected = value.display_text();
        let shown = choice_display(self, inherited, selected)?;

        self.write_with_appearance(dict, name, inherited, false, &shown, |walker| {
            walker.writer.write_key("V")?;
            match value {
                FieldValue::Choices(items) => {
                    walker.writer.start_array()?;
                    for item in items {
                        walker.writer.write_literal_string(&encode_text_string(item))?;
                    }
                    walker.writer.end_array()
                }
                other => walker
                    .writer
                    .write_literal_string(&encode_text_string(&other.display_text())),
            }
        })
    }

    /// Rewrite a text or choice field with new value entries and regenerate its appearance.
    ///
    /// The appearance lives on the field itself when it has no kids or is merged with its
    /// widget; otherwise every widget kid receives its own.
    fn write_with_appearance(
        &mut self,
        dict: &Dictionary,
        name: &str,
        inherited: &Inherited,
        rich: bool,
        shown: &str,
        write_value: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let kids = match self.doc.resolve_key(dict, "Kids")? {
            Some(kids) if !dict.is_widget() => Some(kids.expect_array()?.to_vec()),
            _ => None,
        };

        let mut excluded = vec!["V"];
        if rich {
            excluded.push("RV");
        }
        match kids {
            None => {
                excluded.push("AP");
                start_rewrite(&mut self.writer, dict, &excluded)?;
                write_value(self)?;
                let appearance =
                    self.appearances
                        .plan(self.doc, &mut self.writer, dict, inherited, shown, name)?;
                write_appearance_entry(&mut self.writer, appearance.id)?;
                self.writer.end_dictionary()?;
                self.writer.end_object()?;
                self.schedule(vec![Task::Appearance(appearance)]);
            }
            Some(kids) => {
                excluded.push("Kids");
                start_rewrite(&mut self.writer, dict, &excluded)?;
                write_value(self)?;
                self.writer.write_key("Kids")?;
                let refs = self.write_kids(&kids)?;

                let mut tasks = Vec::with_capacity(refs.len());
                for kid in refs {
                    let widget = self.load(&kid)?;
                    let appearance = self.appearances.plan(
                        self.doc,
                        &mut self.writer,
                        widget.expect_dict()?,
                        inherited,
                        shown,
                        name,
                    )?;
                    tasks.push(Task::Widget {
                        id: kid.id,
                        node: widget,
                        update: WidgetUpdate::Appearance(appearance),
                    });
                }
                self.writer.end_dictionary()?;
                self.writer.end_object()?;
                self.schedule(tasks);
            }
        }
        Ok(())
    }
}
