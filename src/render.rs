use serde_json::Value;

use crate::models::post::Category;

/// Renders a full public page: the site shell around the page-specific body.
///
/// `context` carries `site_name` plus whatever the page needs: `posts` and
/// `active_category` for the list, `post`, `content_html` and `credits` for
/// a single post.
pub fn render_page(template_type: &str, context: &Value) -> String {
    let body_html = match template_type {
        "post_list" => render_post_list(context),
        "post_single" => render_post_single(context),
        _ => render_404(context),
    };

    let site_name = ctx_str(context, "site_name", "Basecamp");
    let page_title = match context.get("post").and_then(|p| p.get("title")).and_then(|v| v.as_str()) {
        Some(title) => format!("{} · {}", title, site_name),
        None => site_name.to_string(),
    };
    let description = context
        .get("post")
        .and_then(|p| p.get("excerpt"))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{page_title}</title>
    <meta name="description" content="{description}">
    <style>
        {base_css}
    </style>
</head>
<body>
    <header class="site-header">
        <a class="site-name" href="/">{site_name}</a>
        <p class="site-tagline">trails, summits and what we ate afterwards</p>
    </header>
    <main class="content">
        {body_html}
    </main>
    <footer class="site-footer">
        <p>&copy; {year} {site_name}</p>
    </footer>
</body>
</html>"#,
        page_title = html_escape(&page_title),
        description = html_escape(description),
        base_css = DEFAULT_CSS,
        site_name = html_escape(site_name),
        body_html = body_html,
        year = chrono::Utc::now().format("%Y"),
    )
}

fn ctx_str<'a>(value: &'a Value, key: &str, default: &'a str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}

/// "all" plus one link per category; the active one is highlighted.
fn build_category_bar(active: &str) -> String {
    let mut html = String::from("<nav class=\"category-bar\">");
    let all_active = if active.is_empty() { " active" } else { "" };
    html.push_str(&format!("<a href=\"/\" class=\"cat-link{}\">All</a>", all_active));
    for category in Category::ALL {
        let active_class = if category.as_str() == active { " active" } else { "" };
        html.push_str(&format!(
            "<a href=\"/?category={}\" class=\"cat-link{}\">{}</a>",
            category.as_str(),
            active_class,
            html_escape(category.label())
        ));
    }
    html.push_str("</nav>");
    html
}

fn category_label(slug: &str) -> &'static str {
    slug.parse::<Category>().map(|c| c.label()).unwrap_or("")
}

fn render_post_list(context: &Value) -> String {
    let active = context
        .get("active_category")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let mut html = build_category_bar(active);

    let posts = match context.get("posts") {
        Some(Value::Array(p)) if !p.is_empty() => p,
        _ => {
            let message = if active.is_empty() {
                "No posts yet.".to_string()
            } else {
                format!("No {} posts yet.", category_label(active).to_lowercase())
            };
            html.push_str(&format!("<p class=\"empty\">{}</p>", html_escape(&message)));
            return html;
        }
    };

    html.push_str("<div class=\"post-grid\">");
    for post in posts {
        let id = ctx_str(post, "id", "");
        let title = ctx_str(post, "title", "");
        let image = ctx_str(post, "image", "");
        let excerpt = ctx_str(post, "excerpt", "");
        let category = ctx_str(post, "category", "");
        let date = format_date(ctx_str(post, "date", ""));
        let read_time = ctx_str(post, "readTime", "");

        let thumb_html = if image.is_empty() {
            String::new()
        } else {
            format!(
                "<div class=\"post-thumb\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></div>",
                html_escape(image),
                html_escape(title)
            )
        };

        let mut meta_parts = vec![format!(
            "<span class=\"post-category\">{}</span>",
            html_escape(category_label(category))
        )];
        if !date.is_empty() {
            meta_parts.push(format!("<time>{}</time>", html_escape(&date)));
        }
        if !read_time.is_empty() {
            meta_parts.push(format!("<span class=\"reading-time\">{}</span>", html_escape(read_time)));
        }

        html.push_str(&format!(
            "<article class=\"post-card\"><a href=\"/posts/{id}\">{thumb}<h2>{title}</h2></a>\
             <div class=\"post-meta\">{meta}</div><p class=\"post-excerpt\">{excerpt}</p></article>",
            id = html_escape(id),
            thumb = thumb_html,
            title = html_escape(title),
            meta = meta_parts.join(" · "),
            excerpt = html_escape(excerpt),
        ));
    }
    html.push_str("</div>");
    html
}

fn render_post_single(context: &Value) -> String {
    let post = match context.get("post") {
        Some(p) => p,
        None => return render_404(context),
    };
    let title = ctx_str(post, "title", "");
    let category = ctx_str(post, "category", "");
    let date = format_date(ctx_str(post, "date", ""));
    let read_time = ctx_str(post, "readTime", "");
    let content = ctx_str(context, "content_html", "");

    let mut html = format!(
        "<article class=\"post-single\">\n    <a class=\"back-link\" href=\"/?category={}\">&larr; {}</a>\n    <h1>{}</h1>",
        html_escape(category),
        html_escape(category_label(category)),
        html_escape(title),
    );

    let mut meta_parts: Vec<String> = Vec::new();
    if !date.is_empty() {
        meta_parts.push(format!("<time>{}</time>", html_escape(&date)));
    }
    if !read_time.is_empty() {
        meta_parts.push(format!("<span class=\"reading-time\">{}</span>", html_escape(read_time)));
    }
    if !meta_parts.is_empty() {
        html.push_str(&format!("\n    <div class=\"post-meta\">{}</div>", meta_parts.join(" · ")));
    }

    let credits: &[Value] = match context.get("credits") {
        Some(Value::Array(c)) => c,
        _ => &[],
    };
    if let Some(hero) = credits.first() {
        html.push_str(&format!(
            "<figure class=\"hero\"><a href=\"#photo-0\"><img src=\"{}\" alt=\"{}\"></a>{}</figure>",
            html_escape(ctx_str(hero, "url", "")),
            html_escape(ctx_str(hero, "alt", title)),
            build_credit_line(hero),
        ));
    }

    html.push_str(&format!("<div class=\"post-content\">{}</div>", content));

    if credits.len() > 1 {
        html.push_str(&render_gallery(&credits[1..], 1));
    }
    html.push_str(&render_lightbox(credits));
    html.push_str("</article>");
    html
}

/// Thumbnails for the secondary images. `offset` is the lightbox index of
/// the first one.
fn render_gallery(credits: &[Value], offset: usize) -> String {
    let mut html = String::from("<section class=\"gallery\"><h2>Gallery</h2><div class=\"gallery-grid\">");
    for (i, credit) in credits.iter().enumerate() {
        html.push_str(&format!(
            "<figure><a href=\"#photo-{}\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></a>{}</figure>",
            i + offset,
            html_escape(ctx_str(credit, "url", "")),
            html_escape(ctx_str(credit, "alt", "")),
            build_credit_line(credit),
        ));
    }
    html.push_str("</div></section>");
    html
}

/// "Photo: <name>", linked to the source page for embeds, plus copyright.
fn build_credit_line(credit: &Value) -> String {
    let photographer = html_escape(ctx_str(credit, "photographer", ""));
    let name = match credit.get("page_url").and_then(|v| v.as_str()) {
        Some(url) if !url.is_empty() => format!(
            "<a href=\"{}\" rel=\"noopener\" target=\"_blank\">{}</a>",
            html_escape(url),
            photographer
        ),
        _ => photographer,
    };
    let mut html = format!("<figcaption class=\"credit\">Photo: {}", name);
    if let Some(copyright) = credit.get("copyright").and_then(|v| v.as_str()) {
        html.push_str(&format!(" <span class=\"copyright\">{}</span>", html_escape(copyright)));
    }
    html.push_str("</figcaption>");
    html
}

/// One overlay per image, opened through the URL fragment.
fn render_lightbox(credits: &[Value]) -> String {
    let count = credits.len();
    let mut html = String::new();
    for (i, credit) in credits.iter().enumerate() {
        let title = credit.get("title").and_then(|v| v.as_str()).unwrap_or("");
        let mut nav = String::new();
        if count > 1 {
            nav.push_str(&format!(
                "<a class=\"lb-prev\" href=\"#photo-{}\">&lsaquo;</a><a class=\"lb-next\" href=\"#photo-{}\">&rsaquo;</a>",
                (i + count - 1) % count,
                (i + 1) % count
            ));
        }
        html.push_str(&format!(
            "<div class=\"lightbox\" id=\"photo-{i}\"><a class=\"lb-close\" href=\"#\">&times;</a>{nav}\
             <figure><img src=\"{url}\" alt=\"{alt}\">{title}{credit}<span class=\"lb-count\">{n} / {count}</span></figure></div>",
            i = i,
            nav = nav,
            url = html_escape(ctx_str(credit, "url", "")),
            alt = html_escape(ctx_str(credit, "alt", "")),
            title = if title.is_empty() {
                String::new()
            } else {
                format!("<p class=\"lb-title\">{}</p>", html_escape(title))
            },
            credit = build_credit_line(credit),
            n = i + 1,
            count = count,
        ));
    }
    html
}

fn render_404(_context: &Value) -> String {
    r#"<div class="not-found"><h1>Not found</h1><p>That trail does not go anywhere.</p><p><a href="/">Back to all posts</a></p></div>"#
        .to_string()
}

/// `2024-03-05` → `March 5, 2024`. Anything else is shown as given.
fn format_date(raw: &str) -> String {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const DEFAULT_CSS: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: Georgia, 'Times New Roman', serif; color: #2b2b2b; background: #faf8f4; line-height: 1.6; }
a { color: #2f5d50; }
.site-header { padding: 2rem 1.5rem 1rem; text-align: center; }
.site-name { font-size: 2rem; font-weight: bold; text-decoration: none; color: #1f2d27; }
.site-tagline { margin: .25rem 0 0; color: #6b6b6b; font-style: italic; }
.content { max-width: 1100px; margin: 0 auto; padding: 0 1.5rem 3rem; }
.category-bar { display: flex; flex-wrap: wrap; gap: .5rem; justify-content: center; margin: 1rem 0 2rem; }
.cat-link { padding: .3rem .9rem; border: 1px solid #c9c2b4; border-radius: 999px; text-decoration: none; font-family: sans-serif; font-size: .9rem; }
.cat-link.active { background: #2f5d50; border-color: #2f5d50; color: #fff; }
.post-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(300px, 1fr)); gap: 2rem; }
.post-card a { text-decoration: none; color: inherit; }
.post-card h2 { margin: .75rem 0 .25rem; font-size: 1.35rem; }
.post-thumb img { width: 100%; aspect-ratio: 3 / 2; object-fit: cover; border-radius: 4px; }
.post-meta { font-family: sans-serif; font-size: .85rem; color: #6b6b6b; }
.post-category { text-transform: uppercase; letter-spacing: .05em; color: #2f5d50; }
.post-single { max-width: 760px; margin: 0 auto; }
.post-single h1 { font-size: 2.4rem; margin: .5rem 0; }
.back-link { font-family: sans-serif; font-size: .9rem; text-decoration: none; }
.hero { margin: 1.5rem 0; }
.hero img, .gallery img { width: 100%; border-radius: 4px; display: block; }
.credit { font-family: sans-serif; font-size: .8rem; color: #6b6b6b; margin-top: .35rem; }
.copyright { margin-left: .5rem; }
.post-content h2 { margin-top: 2rem; }
.gallery-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 1rem; }
.gallery figure { margin: 0; }
.gallery img { aspect-ratio: 1; object-fit: cover; }
.lightbox { display: none; position: fixed; inset: 0; background: rgba(10, 10, 10, .92); z-index: 10; align-items: center; justify-content: center; }
.lightbox:target { display: flex; }
.lightbox figure { margin: 0; max-width: 92vw; text-align: center; color: #eee; }
.lightbox img { max-width: 92vw; max-height: 80vh; }
.lightbox .credit, .lightbox .credit a { color: #ccc; }
.lb-close, .lb-prev, .lb-next { position: absolute; color: #fff; text-decoration: none; font-size: 2.5rem; padding: 1rem; }
.lb-close { top: 0; right: 0; }
.lb-prev { left: 0; top: 45%; }
.lb-next { right: 0; top: 45%; }
.lb-title { margin: .5rem 0 0; }
.lb-count { display: block; font-family: sans-serif; font-size: .75rem; color: #999; }
.empty, .not-found { text-align: center; color: #6b6b6b; padding: 3rem 0; }
.site-footer { text-align: center; font-family: sans-serif; font-size: .8rem; color: #999; padding: 2rem; }
"#;
