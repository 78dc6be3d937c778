use std::{process, sync::Arc};

use blogdesk::{
    application::{
        actions::PostActions,
        editor::{KeywordKey, PostEditor, SubmitOutcome},
        error::AppError,
        notify::{ToastKind, ToastLog},
        pagination::PageLink,
        query::{CategoryFilter, ListSession, QueryState, SortOrder},
        store::PostStore,
    },
    config::{self, Command, CreateArgs, DeleteArgs, ListArgs, Settings, ShowArgs},
    domain::{
        posts::{Category, Post, PostId},
        uploads::ImageFile,
    },
    infra::{error::InfraError, http::HttpBlogClient, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

type Actions = PostActions<HttpBlogClient>;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let client = HttpBlogClient::new(&settings.api)?;
    info!(collection = %client.collection_url(), "blog client ready");
    let actions = PostActions::new(Arc::new(client), PostStore::new());

    match cli_args.command {
        Command::List(args) => run_list(&actions, &settings, args).await,
        Command::Show(args) => run_show(&actions, args).await,
        Command::Create(args) => run_create(&actions, &settings, args).await,
        Command::Delete(args) => run_delete(&actions, args).await,
    }
}

#[derive(Serialize)]
struct ListOutput<'a> {
    posts: &'a [Post],
    total_items: u64,
    total_pages: u32,
    current_page: u32,
    pages: Vec<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    empty_message: Option<&'static str>,
}

async fn run_list(actions: &Actions, settings: &Settings, args: ListArgs) -> Result<(), AppError> {
    let category = match args.category.as_deref() {
        Some(value) => value.parse::<CategoryFilter>()?,
        None => CategoryFilter::default(),
    };
    let sort = match args.sort.as_deref() {
        Some(value) => value.parse::<SortOrder>()?,
        None => SortOrder::default(),
    };

    let search = args.search.unwrap_or_default();
    let state = QueryState {
        search_term: search.clone(),
        debounced_search_term: search,
        category,
        sort,
        page: args.page,
    };
    let session = ListSession::from_settings(actions.clone(), settings).starting_at(state);
    let coordinator = session.coordinator();

    let page = actions.list(&coordinator.current_query()).await?;
    print_json(&ListOutput {
        posts: &page.posts,
        total_items: page.pagination.total_items,
        total_pages: page.pagination.total_pages,
        current_page: page.pagination.current_page,
        pages: page.pagination.window(),
        empty_message: page.posts.is_empty().then(|| coordinator.empty_message()),
    })
}

async fn run_show(actions: &Actions, args: ShowArgs) -> Result<(), AppError> {
    actions.fetch_by_slug(&args.slug).await?;
    let state = actions.store().snapshot();
    match state.current_post.as_ref() {
        Some(post) => print_json(post),
        None => Err(AppError::unexpected(format!(
            "post `{}` was not loaded",
            args.slug
        ))),
    }
}

#[derive(Serialize)]
struct CreateOutput<'a> {
    created: Option<&'a Post>,
    next: &'static str,
}

async fn run_create(actions: &Actions, settings: &Settings, args: CreateArgs) -> Result<(), AppError> {
    let mut editor = PostEditor::create(settings.uploads.max_image_bytes.get());
    editor.set_title(args.title);
    editor.set_meta_description(args.meta_description);
    editor.set_image_alt_text(args.image_alt_text);
    editor.set_category(args.category.parse::<Category>()?);
    editor.set_featured(args.featured);
    for keyword in args.keywords {
        editor.set_keyword_input(keyword);
        editor.on_keyword_key(KeywordKey::Enter)?;
    }
    if let Some(path) = args.image.as_deref() {
        let file = ImageFile::from_path(path)
            .await
            .map_err(|err| InfraError::read_file(path, err))?;
        editor.attach_image(file)?;
    }

    let content = tokio::fs::read_to_string(&args.content_file)
        .await
        .map_err(|err| InfraError::read_file(&args.content_file, err))?;

    let toasts = ToastLog::new();
    let outcome = editor.submit(actions, &content, &toasts).await;
    for toast in toasts.drain() {
        match toast.kind {
            ToastKind::Success => info!(text = %toast.text, "notification"),
            ToastKind::Error => warn!(text = %toast.text, "notification"),
        }
    }
    let SubmitOutcome::Navigate(next) = outcome?;

    let state = actions.store().snapshot();
    print_json(&CreateOutput {
        created: state.posts.last(),
        next,
    })
}

async fn run_delete(actions: &Actions, args: DeleteArgs) -> Result<(), AppError> {
    let id = PostId::new(args.id);
    actions.delete(&id).await?;
    print_json(&serde_json::json!({ "deleted": id }))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");
    Ok(())
}
