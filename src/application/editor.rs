//! Create/edit form for a single post.
//!
//! The editor owns draft field values, the keyword input buffer and the image
//! preview. Body HTML is never stored here: it is pulled from the rich-text
//! widget when the form is submitted.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::posts::{
    Category, KeywordError, Keywords, META_DESCRIPTION_MAX_CHARS, Post, PostId, PostImage,
    meta_description_len,
};
use crate::domain::uploads::{AttachmentError, ImageAttachment, ImageFile, validate_image};

use super::actions::PostActions;
use super::api::{BlogApi, ClientError, PostForm};
use super::notify::{Notifier, Toast};
use super::store::Operation;

const SOURCE: &str = "application::editor";

/// Where the admin lands after a successful save.
pub const ADMIN_LIST_PATH: &str = "/admin/blogs";

/// The rich-text widget; yields its current HTML on demand.
pub trait RichTextSource {
    fn html(&self) -> String;
}

impl RichTextSource for String {
    fn html(&self) -> String {
        self.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Content,
    MetaDescription,
    ImageAltText,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Content => "Content",
            Field::MetaDescription => "Meta description",
            Field::ImageAltText => "Image alt text",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: Field },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: Field, max: usize },
}

impl ValidationError {
    pub fn field(&self) -> Field {
        match self {
            ValidationError::Required { field } | ValidationError::TooLong { field, .. } => *field,
        }
    }
}

/// Every failed rule, one entry per field at most.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_field(&self, field: Field) -> Option<&ValidationError> {
        self.0.iter().find(|error| error.field() == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Keyword(#[from] KeywordError),
    #[error(transparent)]
    Remote(#[from] ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(PostId),
}

/// Keys the keyword input reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKey {
    Enter,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub meta_description: String,
    pub image_alt_text: String,
    pub category: Category,
    pub featured: bool,
    pub keywords: Keywords,
    pub image: Option<ImageAttachment>,
    pub existing_image: Option<PostImage>,
}

impl Default for PostDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            meta_description: String::new(),
            image_alt_text: String::new(),
            category: Category::Guides,
            featured: false,
            keywords: Keywords::new(),
            image: None,
            existing_image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Navigate(&'static str),
}

#[derive(Debug, Clone)]
pub struct PostEditor {
    mode: EditorMode,
    draft: PostDraft,
    keyword_input: String,
    image_preview_url: Option<String>,
    max_image_bytes: u64,
}

impl PostEditor {
    pub fn create(max_image_bytes: u64) -> Self {
        Self {
            mode: EditorMode::Create,
            draft: PostDraft::default(),
            keyword_input: String::new(),
            image_preview_url: None,
            max_image_bytes,
        }
    }

    /// Seed the form from an existing post.
    pub fn edit(post: &Post, max_image_bytes: u64) -> Self {
        let draft = PostDraft {
            title: post.title.clone(),
            meta_description: post.meta_description.clone(),
            image_alt_text: post.image_alt_text.clone(),
            category: post.category,
            featured: post.featured,
            keywords: post.keywords.clone(),
            image: None,
            existing_image: post.image.clone(),
        };
        Self {
            mode: EditorMode::Edit(post.id.clone()),
            image_preview_url: post.image.as_ref().map(|image| image.url.clone()),
            draft,
            keyword_input: String::new(),
            max_image_bytes,
        }
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn draft(&self) -> &PostDraft {
        &self.draft
    }

    pub fn image_preview_url(&self) -> Option<&str> {
        self.image_preview_url.as_deref()
    }

    pub fn keyword_input(&self) -> &str {
        &self.keyword_input
    }

    pub fn set_title(&mut self, value: impl Into<String>) {
        self.draft.title = value.into();
    }

    pub fn set_meta_description(&mut self, value: impl Into<String>) {
        self.draft.meta_description = value.into();
    }

    pub fn set_image_alt_text(&mut self, value: impl Into<String>) {
        self.draft.image_alt_text = value.into();
    }

    pub fn set_category(&mut self, category: Category) {
        self.draft.category = category;
    }

    pub fn set_featured(&mut self, featured: bool) {
        self.draft.featured = featured;
    }

    pub fn set_keyword_input(&mut self, value: impl Into<String>) {
        self.keyword_input = value.into();
    }

    /// `(used, max)` for the meta description counter.
    pub fn meta_description_counter(&self) -> (usize, usize) {
        (
            meta_description_len(&self.draft.meta_description),
            META_DESCRIPTION_MAX_CHARS,
        )
    }

    /// Validate and attach an image; on rejection nothing changes.
    pub fn attach_image(&mut self, file: ImageFile) -> Result<(), EditorError> {
        let attachment = validate_image(file, self.max_image_bytes).inspect_err(|err| {
            debug!(source = SOURCE, error = %err, "image rejected");
        })?;
        self.image_preview_url = Some(attachment.preview_url());
        self.draft.image = Some(attachment);
        Ok(())
    }

    pub fn on_keyword_key(&mut self, key: KeywordKey) -> Result<(), EditorError> {
        if key != KeywordKey::Enter {
            return Ok(());
        }
        self.draft.keywords.insert(&self.keyword_input)?;
        self.keyword_input.clear();
        Ok(())
    }

    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        self.draft.keywords.remove(keyword)
    }

    pub fn validate(&self, content: &str) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.draft.title.trim().is_empty() {
            errors.push(ValidationError::Required {
                field: Field::Title,
            });
        }
        if html_is_blank(content) {
            errors.push(ValidationError::Required {
                field: Field::Content,
            });
        }
        if self.draft.meta_description.trim().is_empty() {
            errors.push(ValidationError::Required {
                field: Field::MetaDescription,
            });
        } else if meta_description_len(&self.draft.meta_description) > META_DESCRIPTION_MAX_CHARS
        {
            errors.push(ValidationError::TooLong {
                field: Field::MetaDescription,
                max: META_DESCRIPTION_MAX_CHARS,
            });
        }
        if self.draft.image_alt_text.trim().is_empty() {
            errors.push(ValidationError::Required {
                field: Field::ImageAltText,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn build_form(&self, content: String) -> Result<PostForm, ValidationErrors> {
        self.validate(&content)?;
        Ok(PostForm {
            title: self.draft.title.trim().to_string(),
            content,
            meta_description: self.draft.meta_description.trim().to_string(),
            image_alt_text: self.draft.image_alt_text.trim().to_string(),
            category: self.draft.category,
            featured: self.draft.featured,
            keywords: self.draft.keywords.clone(),
            image: self.draft.image.clone(),
        })
    }

    /// Validate, then create or update depending on the mode.
    pub async fn submit<A>(
        &self,
        actions: &PostActions<A>,
        widget: &dyn RichTextSource,
        notifier: &dyn Notifier,
    ) -> Result<SubmitOutcome, EditorError>
    where
        A: BlogApi + ?Sized,
    {
        let form = match self.build_form(widget.html()) {
            Ok(form) => form,
            Err(errors) => {
                notifier.notify(Toast::error("Please fix the highlighted fields"));
                return Err(errors.into());
            }
        };

        let (operation, result) = match &self.mode {
            EditorMode::Create => (Operation::Create, actions.create(&form).await),
            EditorMode::Edit(id) => (Operation::Update, actions.update(id, &form).await),
        };

        match result {
            Ok(post) => {
                info!(source = SOURCE, %operation, id = %post.id, "post saved");
                let text = match operation {
                    Operation::Create => "Blog created successfully",
                    _ => "Blog updated successfully",
                };
                notifier.notify(Toast::success(text));
                Ok(SubmitOutcome::Navigate(ADMIN_LIST_PATH))
            }
            Err(err) => {
                let text = err
                    .payload_message()
                    .unwrap_or_else(|| operation.default_failure_message().to_string());
                notifier.notify(Toast::error(text));
                Err(err.into())
            }
        }
    }
}

/// True when the markup has no visible text and no embedded media.
fn html_is_blank(html: &str) -> bool {
    let state = Rc::new(RefCell::new(BodyScan::default()));

    let scanned = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img, iframe, video", {
                let state = Rc::clone(&state);
                move |_el| {
                    state.borrow_mut().has_media = true;
                    Ok(())
                }
            })],
            // Document-level so text outside any element is seen too.
            document_content_handlers: vec![doc_text!({
                let state = Rc::clone(&state);
                move |t| {
                    state.borrow_mut().text.push_str(t.as_str());
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    );

    if let Err(err) = scanned {
        warn!(source = SOURCE, error = %err, "content markup could not be scanned");
        return html.trim().is_empty();
    }

    let scan = state.borrow();
    !scan.has_media && text_is_blank(&scan.text)
}

#[derive(Debug, Default)]
struct BodyScan {
    has_media: bool,
    text: String,
}

/// Raw text chunks keep their entities; any entity other than a
/// whitespace reference counts as visible content.
fn text_is_blank(raw: &str) -> bool {
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        if !rest[..start].chars().all(char::is_whitespace) {
            return false;
        }
        let after = &rest[start + 1..];
        let Some(end) = after.find(';') else {
            return false;
        };
        if !entity_is_whitespace(&after[..end]) {
            return false;
        }
        rest = &after[end + 1..];
    }
    rest.chars().all(char::is_whitespace)
}

fn entity_is_whitespace(name: &str) -> bool {
    let decoded = if let Some(hex) = name
        .strip_prefix("#x")
        .or_else(|| name.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(decimal) = name.strip_prefix('#') {
        decimal.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match name {
            "nbsp" | "NonBreakingSpace" => Some('\u{a0}'),
            "ensp" => Some('\u{2002}'),
            "emsp" => Some('\u{2003}'),
            "thinsp" => Some('\u{2009}'),
            "Tab" => Some('\t'),
            "NewLine" => Some('\n'),
            _ => None,
        }
    };
    decoded.is_some_and(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::actions::testing::{Call, FakeApi, post};
    use crate::application::notify::{ToastKind, ToastLog};
    use crate::application::store::PostStore;
    use crate::domain::uploads::DEFAULT_MAX_IMAGE_BYTES;

    fn filled() -> PostEditor {
        let mut editor = PostEditor::create(DEFAULT_MAX_IMAGE_BYTES);
        editor.set_title("Launch notes");
        editor.set_meta_description("What shipped this week");
        editor.set_image_alt_text("Release banner");
        editor.set_category(Category::Announcements);
        editor
    }

    fn png(len: usize) -> ImageFile {
        ImageFile::new("banner.png", Some("image/png".into()), vec![1u8; len])
    }

    #[test]
    fn meta_description_limit_is_inclusive() {
        let mut editor = filled();
        editor.set_meta_description("a".repeat(200));
        assert!(editor.validate("<p>body</p>").is_ok());
        assert_eq!(editor.meta_description_counter(), (200, 200));

        editor.set_meta_description("a".repeat(201));
        let errors = editor.validate("<p>body</p>").expect_err("201 rejected");
        assert_eq!(
            errors.for_field(Field::MetaDescription),
            Some(&ValidationError::TooLong {
                field: Field::MetaDescription,
                max: 200
            })
        );
    }

    #[test]
    fn empty_form_reports_every_required_field() {
        let editor = PostEditor::create(DEFAULT_MAX_IMAGE_BYTES);
        let errors = editor.validate("<p><br></p>").expect_err("empty form");
        for field in [
            Field::Title,
            Field::Content,
            Field::MetaDescription,
            Field::ImageAltText,
        ] {
            assert!(errors.for_field(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn blank_markup_is_detected() {
        assert!(html_is_blank("<p><br></p>"));
        assert!(html_is_blank("<p>&nbsp;</p>"));
        assert!(html_is_blank("<p>&#160;</p>"));
        assert!(html_is_blank("<p>&#xA0; &ensp;</p>"));
        assert!(html_is_blank(r#"<p data-x="a>b"></p>"#));
        assert!(!html_is_blank("<p>hi</p>"));
        assert!(!html_is_blank("<p>&amp;</p>"));
        assert!(!html_is_blank(r#"<P><IMG SRC="x.png"></P>"#));
        assert!(!html_is_blank(r#"<iframe src="https://video.example.com/1"></iframe>"#));
        assert!(!html_is_blank(r#"<p><img src="x.png"></p>"#));
        assert!(!html_is_blank("plain words"));
        assert!(html_is_blank("<!-- draft note --><p> </p>"));
    }

    #[test]
    fn oversized_image_leaves_draft_and_preview_untouched() {
        let mut editor = filled();
        editor.attach_image(png(16)).expect("small image accepted");
        let preview = editor.image_preview_url().map(str::to_string);
        let image = editor.draft().image.clone();

        let err = editor
            .attach_image(png(6 * 1024 * 1024))
            .expect_err("6 MiB rejected");
        assert!(matches!(
            err,
            EditorError::Attachment(AttachmentError::TooLarge { .. })
        ));
        assert_eq!(editor.image_preview_url().map(str::to_string), preview);
        assert_eq!(editor.draft().image, image);
    }

    #[test]
    fn unsupported_image_type_is_rejected() {
        let mut editor = filled();
        let gif = ImageFile::new("a.gif", Some("image/gif".into()), vec![0u8; 4]);
        assert!(editor.attach_image(gif).is_err());
        assert!(editor.draft().image.is_none());
        assert!(editor.image_preview_url().is_none());
    }

    #[test]
    fn keyword_entry_trims_and_rejects_duplicates() {
        let mut editor = filled();
        editor.set_keyword_input("  rust  ");
        editor
            .on_keyword_key(KeywordKey::Other)
            .expect("other keys ignored");
        assert!(editor.draft().keywords.is_empty());

        editor.on_keyword_key(KeywordKey::Enter).expect("added");
        assert_eq!(editor.keyword_input(), "");

        editor.set_keyword_input("rust");
        let err = editor
            .on_keyword_key(KeywordKey::Enter)
            .expect_err("duplicate");
        assert!(matches!(err, EditorError::Keyword(KeywordError::Duplicate(_))));
        assert_eq!(editor.keyword_input(), "rust");

        editor.set_keyword_input("   ");
        assert!(editor.on_keyword_key(KeywordKey::Enter).is_err());

        editor.set_keyword_input("tokio");
        editor.on_keyword_key(KeywordKey::Enter).expect("added");
        assert_eq!(editor.draft().keywords.as_slice(), ["rust", "tokio"]);
        assert!(editor.remove_keyword("rust"));
        assert_eq!(editor.draft().keywords.as_slice(), ["tokio"]);
    }

    #[test]
    fn edit_mode_seeds_from_post() {
        let mut existing = post("42", "Existing");
        existing.image = Some(PostImage {
            url: "https://cdn.example.com/e.png".into(),
            alt_text: "alt".into(),
        });
        let editor = PostEditor::edit(&existing, DEFAULT_MAX_IMAGE_BYTES);
        assert_eq!(editor.mode(), &EditorMode::Edit(PostId::new("42")));
        assert_eq!(editor.draft().title, "Existing");
        assert_eq!(
            editor.image_preview_url(),
            Some("https://cdn.example.com/e.png")
        );
    }

    #[tokio::test]
    async fn create_submit_appends_and_navigates() {
        let api = Arc::new(FakeApi::default());
        api.push_post(Ok(post("2", "Launch notes")));
        let actions = PostActions::new(Arc::clone(&api), PostStore::new());

        let toasts = ToastLog::new();
        let mut editor = filled();
        editor.set_keyword_input("release");
        editor.on_keyword_key(KeywordKey::Enter).expect("keyword");

        let outcome = editor
            .submit(&actions, &"<p>Shipped!</p>".to_string(), &toasts)
            .await
            .expect("submit ok");
        assert_eq!(outcome, SubmitOutcome::Navigate(ADMIN_LIST_PATH));

        let created = api
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Create(form) => Some(form),
                _ => None,
            })
            .expect("create call");
        assert_eq!(created.content, "<p>Shipped!</p>");
        assert_eq!(created.keywords.as_slice(), ["release"]);
        assert_eq!(actions.store().snapshot().posts.len(), 1);
        assert_eq!(toasts.toasts()[0].kind, ToastKind::Success);
    }

    #[tokio::test]
    async fn edit_submit_failure_does_not_navigate() {
        let api = Arc::new(FakeApi::default());
        api.push_post(Err(ClientError::NotFound {
            message: Some("Blog not found".into()),
        }));
        let actions = PostActions::new(Arc::clone(&api), PostStore::new());
        let toasts = ToastLog::new();
        let editor = PostEditor::edit(&post("7", "Gone"), DEFAULT_MAX_IMAGE_BYTES);

        let err = editor
            .submit(&actions, &"<p>body</p>".to_string(), &toasts)
            .await
            .expect_err("update fails");
        assert!(matches!(err, EditorError::Remote(ClientError::NotFound { .. })));
        assert!(matches!(&api.calls()[0], Call::Update(id, _) if id.as_str() == "7"));

        let toast = &toasts.toasts()[0];
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.text, "Blog not found");
    }

    #[tokio::test]
    async fn invalid_submit_makes_no_remote_call() {
        let api = Arc::new(FakeApi::default());
        let actions = PostActions::new(Arc::clone(&api), PostStore::new());
        let toasts = ToastLog::new();
        let editor = PostEditor::create(DEFAULT_MAX_IMAGE_BYTES);

        let err = editor
            .submit(&actions, &String::new(), &toasts)
            .await
            .expect_err("invalid");
        assert!(matches!(err, EditorError::Validation(_)));
        assert!(api.calls().is_empty());
    }
}
