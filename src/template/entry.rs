//! One output page produced by a template.

use super::Template;
use crate::computed::{COLLECTIONS_KEY, ComputedData, PAGE_OUTPUT_PATH_KEY, PAGE_URL_KEY};
use crate::data::{get_path, set_path};
use crate::engine::Content;
use crate::error::ContentAccessError;
use crate::permalink::Behavior;
use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// A page ready to render: its data, location and (once rendered) content.
#[derive(Debug)]
pub struct PageEntry {
    pub template: Arc<Template>,
    /// Unparsed template source.
    pub raw_input: Arc<str>,
    pub data: Value,
    pub page_number: usize,
    pub group_number: usize,
    pub behavior: Behavior,
    url: Option<String>,
    output_path: Option<String>,
    computed: Option<ComputedData>,
    content: Option<Arc<Content>>,
}

impl PageEntry {
    pub(crate) fn new(
        template: Arc<Template>,
        raw_input: Arc<str>,
        data: Value,
        page_number: usize,
        group_number: usize,
        computed: Option<ComputedData>,
    ) -> Self {
        let mut entry = Self {
            template,
            raw_input,
            data,
            page_number,
            group_number,
            behavior: Behavior::WRITE,
            url: None,
            output_path: None,
            computed,
            content: None,
        };
        entry.sync_location();
        entry
    }

    #[inline]
    pub fn input_path(&self) -> &str {
        self.template.input_path()
    }

    /// `page.url`, absent when the page is not written.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// `page.outputPath`, absent when the page is not written.
    pub fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    /// The template body rendered without layouts.
    ///
    /// Fails until the entry has been rendered, and always for entries whose
    /// permalink disables rendering.
    pub fn template_content(&self) -> Result<&Arc<Content>, ContentAccessError> {
        if let Some(content) = &self.content {
            return Ok(content);
        }
        let input = PathBuf::from(self.input_path());
        Err(if self.behavior.render {
            ContentAccessError::NotYetRendered { input }
        } else {
            ContentAccessError::Unrenderable { input }
        })
    }

    pub fn set_template_content(&mut self, content: Arc<Content>) {
        self.content = Some(content);
    }

    pub fn has_template_content(&self) -> bool {
        self.content.is_some()
    }

    /// `true` while computed entries wait for collections.
    pub fn has_pending_data(&self) -> bool {
        self.computed.as_ref().is_some_and(ComputedData::has_pending)
    }

    /// Attach collections and run the computed entries phase 1 deferred.
    pub async fn process_remaining_data(&mut self, collections: &Value) -> Result<()> {
        set_path(&mut self.data, COLLECTIONS_KEY, collections.clone());
        if let Some(computed) = self.computed.as_mut() {
            computed
                .process_remaining_data(&mut self.data, &*self.template)
                .await?;
            self.sync_location();
        }
        Ok(())
    }

    fn sync_location(&mut self) {
        let text = |path| get_path(&self.data, path).and_then(Value::as_str).map(str::to_owned);
        self.url = text(PAGE_URL_KEY);
        self.output_path = text(PAGE_OUTPUT_PATH_KEY);

        let mut behavior = Behavior::from_permalink(get_path(&self.data, "permalink"));
        behavior.write &= self.output_path.is_some();
        self.behavior = behavior;
    }
}
