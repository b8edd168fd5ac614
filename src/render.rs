//! HTML for the shell and each page view.

use std::fmt::Write as _;
use std::time::Instant;

use chrono::NaiveDate;

use crate::form::{Banner, BannerKind, FormController, FormMode};
use crate::models::{format_price, Book, BookId, Field};
use crate::shell::{DeferredNavigation, Route, ShellState, Theme, PLACEHOLDER_USER};
use crate::views::{DeleteState, DetailState, DetailView, ListState};

const FALLBACK_COVER: &str = "/Book.jpg";

/// Disables the submit button once the browser starts posting, so a double
/// click cannot send the form twice.
const DISABLE_ON_SUBMIT: &str =
    "this.querySelector('button[type=submit]').disabled=true;";

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;background:#faf5ff;color:#1f2937}\
body.dark{background:#111827;color:#e5e7eb}\
@media (prefers-color-scheme: dark){body.system{background:#111827;color:#e5e7eb}}\
nav{display:flex;gap:1rem;align-items:center;padding:1rem 2rem;border-bottom:1px solid #e5e7eb}\
main{max-width:72rem;margin:0 auto;padding:2rem}\
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(16rem,1fr));gap:1.5rem}\
.card img,.cover{width:100%;object-fit:cover}\
.error{color:#dc2626}.success{color:#16a34a}\
.banner{animation:dismiss 0s linear var(--dismiss-after) forwards}\
@keyframes dismiss{to{visibility:hidden;height:0;margin:0}}";

/// What every page needs to draw the header.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub shell: ShellState,
    pub system_prefers_dark: bool,
    /// Path of the current page, used for toggle links.
    pub path: String,
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Query string that reproduces `shell` on the next request.
pub fn shell_query(shell: &ShellState) -> String {
    let mut params = Vec::new();
    if shell.theme != Theme::System {
        params.push(format!("theme={}", shell.theme.as_str()));
    }
    if shell.mobile_menu_open {
        params.push("menu=open".to_string());
    }
    if shell.profile_open {
        params.push("profile=open".to_string());
    }
    params.join("&")
}

fn link_with(path: &str, shell: &ShellState) -> String {
    let query = shell_query(shell);
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// Links that leave the page keep the theme but close the menus.
fn nav_link(route: &Route, chrome: &Chrome) -> String {
    let mut shell = chrome.shell;
    shell.navigated();
    escape(&link_with(&route.path(), &shell))
}

pub fn page(
    chrome: &Chrome,
    title: &str,
    body: &str,
    refresh: Option<&DeferredNavigation>,
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    if let Some(navigation) = refresh {
        let _ = write!(
            html,
            "<meta http-equiv=\"refresh\" content=\"{};url={}\">",
            navigation.after.as_secs(),
            nav_link(&navigation.to, chrome)
        );
    }
    let _ = write!(
        html,
        "<title>{} | BookHub</title><style>{STYLE}</style></head>",
        escape(title)
    );
    let theme_class = match chrome.shell.theme {
        Theme::System => "system",
        Theme::Light => "light",
        Theme::Dark => "dark",
    };
    let _ = write!(html, "<body class=\"{theme_class}\">");
    html.push_str(&header(chrome));
    let _ = write!(html, "<main>{body}</main></body></html>");
    html
}

fn header(chrome: &Chrome) -> String {
    let shell = chrome.shell;
    let dark = shell.is_dark(chrome.system_prefers_dark);

    let mut theme_toggled = shell;
    theme_toggled.toggle_theme(chrome.system_prefers_dark);
    let mut menu_toggled = shell;
    menu_toggled.toggle_mobile_menu();
    let mut profile_toggled = shell;
    profile_toggled.toggle_profile();

    let mut html = String::from("<nav>");
    let _ = write!(
        html,
        "<a class=\"brand\" href=\"{}\"><strong>B</strong> BookHub</a>",
        nav_link(&Route::Home, chrome)
    );
    html.push_str(
        "<input type=\"search\" placeholder=\"Search books, authors, ISBN...\" \
         aria-label=\"Search\">",
    );
    let _ = write!(
        html,
        "<a href=\"{}\">Add Book</a>",
        nav_link(&Route::AddBook, chrome)
    );
    let _ = write!(
        html,
        "<a class=\"theme-toggle\" href=\"{}\">{}</a>",
        escape(&link_with(&chrome.path, &theme_toggled)),
        if dark { "Light mode" } else { "Dark mode" }
    );
    let _ = write!(
        html,
        "<a class=\"profile-toggle\" href=\"{}\">{}</a>",
        escape(&link_with(&chrome.path, &profile_toggled)),
        escape(PLACEHOLDER_USER.name)
    );
    if shell.profile_open {
        let mut profile_dismissed = shell;
        profile_dismissed.dismiss_profile();
        let _ = write!(
            html,
            "<div class=\"profile-menu\"><p>{}</p><p>{}</p>\
             <a class=\"close\" href=\"{}\">Close</a></div>",
            escape(PLACEHOLDER_USER.name),
            escape(PLACEHOLDER_USER.email),
            escape(&link_with(&chrome.path, &profile_dismissed))
        );
    }
    let _ = write!(
        html,
        "<a class=\"menu-toggle\" href=\"{}\">{}</a>",
        escape(&link_with(&chrome.path, &menu_toggled)),
        if shell.mobile_menu_open { "Close menu" } else { "Menu" }
    );
    if shell.mobile_menu_open {
        let _ = write!(
            html,
            "<div class=\"mobile-menu\"><a href=\"{}\">Home</a><a href=\"{}\">Add Book</a></div>",
            nav_link(&Route::Home, chrome),
            nav_link(&Route::AddBook, chrome)
        );
    }
    html.push_str("</nav>");
    html
}

fn banner(banner: Option<&Banner>, now: Instant) -> String {
    let Some(banner) = banner else {
        return String::new();
    };
    let class = match banner.kind {
        BannerKind::Success => "success",
        BannerKind::Error => "error",
    };
    format!(
        "<p class=\"banner {class}\" role=\"status\" style=\"--dismiss-after:{}ms\">{}</p>",
        banner.remaining(now).as_millis(),
        escape(&banner.message)
    )
}

pub fn display_date(date: &str) -> String {
    if date.is_empty() {
        return "N/A".to_string();
    }
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%B %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

fn cover_src(book: &Book) -> String {
    escape(book.cover_image.as_deref().unwrap_or(FALLBACK_COVER))
}

pub fn book_list(state: &ListState, chrome: &Chrome) -> String {
    match state {
        ListState::Loading => "<p class=\"loading\">Loading books...</p>".to_string(),
        ListState::Empty => format!(
            "<section class=\"empty\"><h2>No books yet</h2>\
             <p><a href=\"{}\">Add the first one</a></p></section>",
            nav_link(&Route::AddBook, chrome)
        ),
        ListState::Populated(books) => {
            let mut html = String::from("<h2>Recommended Books</h2><div class=\"grid\">");
            for book in books {
                let description = if book.description.is_empty() {
                    "No description available"
                } else {
                    book.description.as_str()
                };
                let author = if book.author_name.is_empty() {
                    "Unknown"
                } else {
                    book.author_name.as_str()
                };
                let _ = write!(
                    html,
                    "<article class=\"card\"><img src=\"{}\" alt=\"{}\"><h3>{}</h3><p>{}</p>\
                     <a href=\"{}\">Read More</a><span>By : {}</span></article>",
                    cover_src(book),
                    escape(&book.title),
                    escape(&book.title),
                    escape(description),
                    nav_link(&Route::Book(book.id.clone()), chrome),
                    escape(author)
                );
            }
            html.push_str("</div>");
            html
        }
    }
}

pub fn book_detail(view: &DetailView, chrome: &Chrome, now: Instant) -> String {
    let book = match view.state() {
        DetailState::Loading => {
            return "<p class=\"loading\">Loading book details...</p>".to_string()
        }
        DetailState::NotFound => return not_found(view, chrome),
        DetailState::Loaded(book) => book,
    };

    let author = if book.author_name.is_empty() {
        "Unknown Author"
    } else {
        book.author_name.as_str()
    };
    let description = if book.description.is_empty() {
        "No description available for this book."
    } else {
        book.description.as_str()
    };
    let isbn = if book.isbn.is_empty() { "N/A" } else { book.isbn.as_str() };
    let price = book.price.map(format_price).unwrap_or_else(|| "N/A".to_string());

    let mut html = String::new();
    let _ = write!(
        html,
        "<a href=\"{}\">Back to Books</a><article class=\"book\">\
         <img class=\"cover\" src=\"{}\" alt=\"{}\">\
         <h1>{}</h1><p class=\"author\">{}</p><p class=\"price\">Rs. {}</p>\
         <dl><dt>Published Date</dt><dd>{}</dd><dt>ISBN</dt><dd>{}</dd>\
         <dt>Publication</dt><dd>{}</dd></dl>\
         <h3>About This Book</h3><p class=\"description\">{}</p>",
        nav_link(&view.back_to_listing(), chrome),
        cover_src(book),
        escape(&book.title),
        escape(&book.title),
        escape(author),
        escape(&price),
        escape(&display_date(&book.published_date)),
        escape(isbn),
        escape(&book.publication),
        escape(description)
    );

    let delete_action = escape(&format!("{}/delete", Route::Book(book.id.clone()).path()));
    match view.delete_state() {
        DeleteState::Confirming => {
            let _ = write!(
                html,
                "<form method=\"post\" action=\"{delete_action}\" class=\"confirm-delete\">\
                 <p>Are you sure you want to delete this book?</p>\
                 <button type=\"submit\">Yes, delete</button> <a href=\"{}\">Cancel</a></form>",
                delete_link(&book.id, chrome, "cancel")
            );
        }
        DeleteState::Deleted => {}
        DeleteState::Deleting => html.push_str("<p class=\"deleting\">Deleting...</p>"),
        DeleteState::Idle => {
            let _ = write!(
                html,
                "<div class=\"actions\"><a href=\"{}\">Edit Book</a> \
                 <a class=\"delete\" href=\"{}\">Delete Book</a></div>",
                nav_link(&view.edit_route(), chrome),
                delete_link(&book.id, chrome, "confirm")
            );
        }
    }

    html.push_str(&banner(view.banner(now), now));
    let _ = write!(
        html,
        "<p class=\"book-id\">Book ID: <code>{}</code></p></article>",
        escape(book.id.as_str())
    );
    html
}

/// Record page link that asks for (`confirm`) or backs out of (`cancel`)
/// the delete prompt.
fn delete_link(id: &BookId, chrome: &Chrome, step: &str) -> String {
    let mut shell = chrome.shell;
    shell.navigated();
    let link = link_with(&Route::Book(id.clone()).path(), &shell);
    let separator = if link.contains('?') { '&' } else { '?' };
    escape(&format!("{link}{separator}delete={step}"))
}

fn not_found(view: &DetailView, chrome: &Chrome) -> String {
    format!(
        "<section class=\"not-found\"><h2>Book Not Found</h2>\
         <p>Sorry, we couldn't find this book.</p><a href=\"{}\">Back to Books</a></section>",
        nav_link(&view.back_to_listing(), chrome)
    )
}

pub fn unknown_route(chrome: &Chrome) -> String {
    format!(
        "<section class=\"not-found\"><h2>Page Not Found</h2>\
         <a href=\"{}\">Back to Books</a></section>",
        nav_link(&Route::Home, chrome)
    )
}

fn text_input(form: &FormController, field: Field, label: &str, kind: &str) -> String {
    let mut html = format!(
        "<label>{label}<input type=\"{kind}\" name=\"{name}\" value=\"{value}\"></label>",
        name = field.wire_name(),
        value = escape(form.draft().text(field))
    );
    html.push_str(&field_error(form, field));
    html
}

fn field_error(form: &FormController, field: Field) -> String {
    form.error(field)
        .map(|message| {
            format!(
                "<p class=\"error\" data-field=\"{}\">{}</p>",
                field.wire_name(),
                escape(message)
            )
        })
        .unwrap_or_default()
}

pub fn book_form(form: &FormController, now: Instant) -> String {
    let (heading, action, submit_label) = match form.mode() {
        FormMode::Create => ("Add New Book", Route::AddBook.path(), "Add Book to Library"),
        FormMode::Update(id) => ("Edit Book", Route::EditBook(id.clone()).path(), "Update Book"),
    };

    let mut html = String::new();
    let _ = write!(
        html,
        "<h1>{heading}</h1><form method=\"post\" action=\"{}\" \
         enctype=\"multipart/form-data\" onsubmit=\"{DISABLE_ON_SUBMIT}\">",
        escape(&action)
    );

    html.push_str("<fieldset class=\"cover\"><legend>Book Cover</legend>");
    if let Some(preview) = form.preview() {
        let _ = write!(html, "<img class=\"preview\" src=\"{}\" alt=\"Preview\">", escape(preview));
    }
    if let Some(stored) = form.stored_cover() {
        let _ = write!(
            html,
            "<input type=\"hidden\" name=\"currentCover\" value=\"{}\">",
            escape(stored)
        );
    }
    let _ = write!(
        html,
        "<input type=\"file\" name=\"{}\" accept=\"image/*\">",
        Field::CoverImage.wire_name()
    );
    html.push_str(&field_error(form, Field::CoverImage));
    html.push_str("</fieldset>");

    html.push_str(&text_input(form, Field::Title, "Book Title", "text"));
    html.push_str(&text_input(form, Field::Price, "Price (Rs.)", "number"));
    html.push_str(&text_input(form, Field::AuthorName, "Author Name", "text"));
    html.push_str(&text_input(form, Field::Isbn, "ISBN Number", "text"));
    html.push_str(&text_input(form, Field::Publication, "Publication", "text"));
    html.push_str(&text_input(form, Field::PublishedDate, "Published Date", "date"));

    let _ = write!(
        html,
        "<label>Book Description<textarea name=\"{}\" rows=\"6\">{}</textarea></label>",
        Field::Description.wire_name(),
        escape(form.draft().text(Field::Description))
    );
    html.push_str(&field_error(form, Field::Description));

    let disabled = if form.submit_enabled() { "" } else { " disabled" };
    let _ = write!(html, "<button type=\"submit\"{disabled}>{submit_label}</button>");
    html.push_str(&banner(form.banner(now), now));
    html.push_str("</form>");
    html
}
