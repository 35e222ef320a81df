/*
 * processor.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The citation processor: drives the registry from tag events.
//!
//! One [`CiteProcessor`] lives for exactly one document render. For every
//! `<ref>` it validates the tag, expands the body, then calls `register`,
//! `set_content`, `set_direction` and `set_extends` in that order. For every
//! `<references>` it opens a list frame, corrects any citations that were
//! expanded speculatively, closes the group and renders it. [`finish`]
//! reports leftover citations and resolves strip markers.
//!
//! [`finish`]: CiteProcessor::finish

use serde::Serialize;

use quarto_cite_registry::validator::{self, RefCheck};
use quarto_cite_registry::{
    Entry, EntryKey, RawInvocation, ReferenceRegistry, RegistrationContext, Warning,
};

use crate::args::{ListArgs, RefArgs};
use crate::error::Result;
use crate::expander::{CiteHandler, MarkupExpander};
use crate::markers::{StripMarkers, count_ref_markers};
use crate::options::{CiteOptions, OrphanPolicy};
use crate::render::{CiteRenderer, FootnoteMark, PlainTextRenderer};

/// The citation list currently being expanded.
#[derive(Debug)]
struct ListFrame {
    group: String,
    /// Blocking problems raised inside the list, shown below it.
    errors: Vec<Warning>,
}

/// Everything the processor learned about a document's citations.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CiteReport {
    /// Entries of every closed group, in the order the groups closed.
    pub entries: Vec<Entry>,
    /// Problems that kept a citation or list out of the registry.
    pub errors: Vec<Warning>,
}

impl CiteReport {
    /// Every warning, attached or not.
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.entries
            .iter()
            .flat_map(|entry| entry.warnings.iter())
            .chain(self.errors.iter())
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }
}

/// Final output of a document render.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub text: String,
    pub report: CiteReport,
}

pub struct CiteProcessor<R: CiteRenderer = PlainTextRenderer> {
    registry: ReferenceRegistry,
    options: CiteOptions,
    renderer: R,
    markers: StripMarkers,
    list: Option<ListFrame>,
    report: CiteReport,
}

impl CiteProcessor<PlainTextRenderer> {
    /// Processor with the plain-text renderer configured from `options`.
    pub fn plain(options: CiteOptions) -> Self {
        let renderer = PlainTextRenderer::new(&options);
        Self::new(options, renderer)
    }
}

impl<R: CiteRenderer> CiteProcessor<R> {
    pub fn new(options: CiteOptions, renderer: R) -> Self {
        Self {
            registry: ReferenceRegistry::new(),
            options,
            renderer,
            markers: StripMarkers::new(),
            list: None,
            report: CiteReport::default(),
        }
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CiteOptions {
        &self.options
    }

    /// Whether a citation list is currently open.
    pub fn in_list(&self) -> bool {
        self.list.is_some()
    }

    /// Expand a whole document and finish it.
    pub fn render_document(
        mut self,
        expander: &mut dyn MarkupExpander,
        source: &str,
    ) -> Result<RenderedDocument> {
        let expanded = expander.expand(&mut self, source)?;
        self.finish(&expanded)
    }

    /// Report blocking problems: inline in running text, below the list
    /// when inside one.
    fn report_blocking(&mut self, warnings: Vec<Warning>) -> String {
        for warning in &warnings {
            tracing::warn!(code = warning.code(), "{}", warning.message());
        }
        match self.list.as_mut() {
            Some(frame) => {
                frame.errors.extend(warnings);
                String::new()
            }
            None => {
                let rendered = warnings
                    .iter()
                    .map(|warning| self.renderer.inline_warning(warning))
                    .collect::<Vec<_>>()
                    .join(" ");
                self.report.errors.extend(warnings);
                rendered
            }
        }
    }

    fn process_ref(
        &mut self,
        expander: &mut dyn MarkupExpander,
        content: Option<&str>,
        args: &[(String, String)],
        context: RegistrationContext,
    ) -> Result<String> {
        let invocation = RawInvocation::new(content, args);
        let parsed = match RefArgs::parse(args) {
            Ok(parsed) => parsed,
            Err(warning) => return Ok(self.report_blocking(vec![warning])),
        };

        let list_group = self.list.as_ref().map(|frame| frame.group.clone());
        let group = parsed
            .group
            .clone()
            .or_else(|| list_group.clone())
            .unwrap_or_default();

        // A blank body counts as no body, so a later definition can fill it.
        let expanded = match content {
            Some(raw) => Some(expander.expand(self, raw)?).filter(|body| !body.trim().is_empty()),
            None => None,
        };

        let check = RefCheck {
            group: &group,
            name: parsed.name.as_deref(),
            content: expanded.as_deref(),
            extends: parsed.extends.as_deref(),
            follow: parsed.follow.as_deref(),
            direction: parsed.dir.as_deref(),
            context,
            list_group: list_group.as_deref(),
        };
        let (blocking, mut attached): (Vec<Warning>, Vec<Warning>) = validator::check_ref(&check)
            .into_iter()
            .partition(Warning::is_blocking);
        if !blocking.is_empty() {
            return Ok(self.report_blocking(blocking));
        }

        if let Some(target) = parsed.follow.as_deref() {
            let resolvable = self
                .registry
                .entry(&group, &EntryKey::Named(target.to_string()))
                .is_some_and(|entry| !entry.is_placeholder);
            if resolvable {
                self.registry.append_content(
                    &group,
                    target,
                    expanded.as_deref().unwrap_or("").trim(),
                    context,
                    invocation,
                )?;
                // Follow citations render nothing, but still leave a marker so
                // speculative expansion can be counted.
                return Ok(self.markers.insert(String::new()));
            }
            tracing::debug!(group = %group, target, "Follow target not found, citing standalone");
        }

        let duplicate = match (parsed.name.as_deref(), expanded.as_deref()) {
            (Some(name), Some(body)) => validator::check_duplicate(&self.registry, &group, name, body),
            _ => None,
        };

        let key = self
            .registry
            .register(&group, parsed.name.as_deref(), context, invocation);
        if let Some(body) = expanded.as_deref() {
            self.registry.set_content(&group, &key, body)?;
        }
        if let Some(dir) = parsed.dir.as_deref().filter(|dir| validator::is_valid_direction(dir)) {
            self.registry
                .set_direction(&group, &key, &dir.to_ascii_lowercase())?;
        }
        if let Some(parent) = parsed.extends.as_deref() {
            attached.extend(validator::check_nested_continuation(
                &self.registry,
                &group,
                parent,
            ));
            self.registry.set_extends(&group, &key, parent)?;
        }
        if let Some(target) = parsed.follow {
            self.registry.set_follows(&group, &key, &target)?;
        }
        attached.extend(duplicate);
        if !attached.is_empty() {
            self.registry.set_warnings(&group, &key, attached)?;
        }

        if context.is_definition() {
            return Ok(String::new());
        }
        let mark = match self.registry.entry(&group, &key) {
            Some(entry) => FootnoteMark::from_entry(entry),
            None => return Ok(String::new()),
        };
        let rendered = self.renderer.footnote_mark(&mark);
        Ok(self.markers.insert(rendered))
    }

    /// Expand a list body with the list frame open.
    fn expand_list(
        &mut self,
        expander: &mut dyn MarkupExpander,
        content: Option<&str>,
    ) -> Result<()> {
        let Some(raw) = content else {
            return Ok(());
        };

        // Citations a templating layer already expanded were registered as
        // occurrences; undo them and replay them as definitions.
        let speculative = count_ref_markers(raw);
        if speculative > 0 {
            let replay = self.registry.rollback(speculative)?;
            tracing::debug!(
                speculative,
                replayed = replay.len(),
                "Replaying citations as list definitions"
            );
            for call in replay {
                self.process_ref(
                    expander,
                    call.content.as_deref(),
                    &call.args,
                    RegistrationContext::InList,
                )?;
            }
        }

        expander.expand(self, raw)?;
        Ok(())
    }

    /// Close a group: end-of-list checks, pop, render.
    fn close_group(&mut self, group: &str, errors: &[Warning]) -> Result<String> {
        validator::check_list_closed(&mut self.registry, group)?;
        let entries = self.registry.pop_group(group);
        let refs: Vec<&Entry> = entries.values().collect();
        let rendered = if refs.is_empty() && errors.is_empty() {
            String::new()
        } else {
            self.renderer.reference_list(group, &refs, errors)
        };
        tracing::debug!(group, entries = refs.len(), "Closed citation list");

        self.report.entries.extend(entries.into_iter().map(|(_, entry)| entry));
        self.report.errors.extend(errors.iter().cloned());
        Ok(rendered)
    }

    /// End of document.
    ///
    /// Leftover citations are reported per entry (and once per group in the
    /// output), then every strip marker in `text` is replaced by its mark.
    pub fn finish(mut self, text: &str) -> Result<RenderedDocument> {
        let mut output = text.to_string();

        if self.options.orphans == OrphanPolicy::AutoList && self.registry.has_group("") {
            let list = self.close_group("", &[])?;
            if !list.is_empty() {
                output.push_str("\n\n");
                output.push_str(&list);
            }
        }

        let leftovers = validator::check_document_end(&mut self.registry)?;
        let groups: Vec<String> = self
            .registry
            .groups()
            .into_iter()
            .map(str::to_string)
            .collect();
        for group in groups {
            let warning = Warning::GroupWithoutList {
                group: group.clone(),
            };
            output.push_str("\n\n");
            output.push_str(&self.renderer.inline_warning(&warning));
            let entries = self.registry.pop_group(&group);
            self.report.entries.extend(entries.into_iter().map(|(_, entry)| entry));
        }
        if !leftovers.is_empty() {
            tracing::warn!(citations = leftovers.len(), "Citations without a citation list");
        }

        if !self.markers.is_empty() {
            tracing::debug!(markers = self.markers.len(), "Resolving strip markers");
        }
        Ok(RenderedDocument {
            text: self.markers.resolve(&output),
            report: self.report,
        })
    }
}

impl<R: CiteRenderer> CiteHandler for CiteProcessor<R> {
    fn ref_tag(
        &mut self,
        expander: &mut dyn MarkupExpander,
        content: Option<&str>,
        args: &[(String, String)],
    ) -> Result<String> {
        let context = if self.list.is_some() {
            RegistrationContext::InList
        } else {
            RegistrationContext::Standalone
        };
        self.process_ref(expander, content, args, context)
    }

    fn references_tag(
        &mut self,
        expander: &mut dyn MarkupExpander,
        content: Option<&str>,
        args: &[(String, String)],
    ) -> Result<String> {
        if self.list.is_some() {
            return Ok(self.report_blocking(vec![Warning::NestedList]));
        }
        let group = match ListArgs::parse(args) {
            Ok(parsed) => parsed.group.unwrap_or_default(),
            Err(warning) => return Ok(self.report_blocking(vec![warning])),
        };
        tracing::debug!(group = %group, "Opening citation list");

        self.list = Some(ListFrame {
            group: group.clone(),
            errors: Vec::new(),
        });
        let expanded = self.expand_list(expander, content);
        let errors = self
            .list
            .take()
            .map(|frame| frame.errors)
            .unwrap_or_default();
        expanded?;

        self.close_group(&group, &errors)
    }
}
