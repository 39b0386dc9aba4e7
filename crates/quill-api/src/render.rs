//! Server-side HTML for the page routes. Plain string building; every value
//! that came from a user goes through `escape`.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use quill_types::models::{Comment, Post, PostSort};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<title>{title}</title>
</head>
<body>
<header><a href=\"/\">Blog</a> | <a href=\"/create\">New post</a></header>
<main>
{body}
</main>
</body>
</html>
",
        title = escape(title),
        body = body
    )
}

pub fn index_page(posts: &[Post], sort: PostSort, author_counts: &BTreeMap<String, i64>) -> String {
    let mut body = String::new();

    body.push_str("<nav class=\"sort\">Sort: ");
    for (label, option) in [("Newest", PostSort::DateDesc), ("A–Z", PostSort::Title)] {
        if option == sort {
            let _ = write!(body, "<strong>{}</strong> ", label);
        } else {
            let _ = write!(body, "<a href=\"/?sort={}\">{}</a> ", option.as_query(), label);
        }
    }
    body.push_str("</nav>\n");

    if posts.is_empty() {
        body.push_str("<p>No posts yet.</p>\n");
    }
    for post in posts {
        let _ = write!(
            body,
            "<article>\n<h2><a href=\"/post/{id}\">{title}</a></h2>\n\
             <p class=\"meta\">by {author} on {created}</p>\n</article>\n",
            id = post.id,
            title = escape(&post.title),
            author = escape(&post.author),
            created = timestamp(&post.created_at),
        );
    }

    body.push_str("<aside>\n<h3>Posts per author</h3>\n<ul>\n");
    for (author, count) in author_counts {
        let _ = writeln!(body, "<li>{}: {}</li>", escape(author), count);
    }
    body.push_str("</ul>\n</aside>");

    layout("Blog", &body)
}

pub fn post_page(post: &Post, comments: &[Comment]) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<article>\n<h1>{title}</h1>\n<p class=\"meta\">by {author} on {created} \
         (updated {updated})</p>\n<div class=\"content\">{content}</div>\n</article>\n",
        title = escape(&post.title),
        author = escape(&post.author),
        created = timestamp(&post.created_at),
        updated = timestamp(&post.updated_at),
        content = escape(&post.content),
    );
    let _ = write!(
        body,
        "<p><a href=\"/edit/{id}\">Edit</a></p>\n\
         <form method=\"post\" action=\"/delete/{id}\"><button type=\"submit\">Delete</button></form>\n",
        id = post.id
    );

    let _ = write!(body, "<section>\n<h2>Comments ({})</h2>\n", comments.len());
    for comment in comments {
        let _ = write!(
            body,
            "<div class=\"comment\"><strong>{who}</strong> <span>{at}</span><p>{text}</p></div>\n",
            who = escape(&comment.commenter),
            at = timestamp(&comment.created_at),
            text = escape(&comment.comment),
        );
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"/post/{id}/comment\">\n\
         <input name=\"commenter\" placeholder=\"Name\" required>\n\
         <textarea name=\"comment\" placeholder=\"Comment\" required></textarea>\n\
         <button type=\"submit\">Add comment</button>\n</form>\n</section>",
        id = post.id
    );

    layout(&post.title, &body)
}

fn post_form(action: &str, submit: &str, post: Option<&Post>) -> String {
    let (title, author, content) = match post {
        Some(p) => (escape(&p.title), escape(&p.author), escape(&p.content)),
        None => Default::default(),
    };
    format!(
        "<form method=\"post\" action=\"{action}\">\n\
         <label>Title <input name=\"title\" value=\"{title}\" required></label>\n\
         <label>Author <input name=\"author\" value=\"{author}\" required></label>\n\
         <label>Content <textarea name=\"content\" required>{content}</textarea></label>\n\
         <button type=\"submit\">{submit}</button>\n</form>",
        action = action,
        title = title,
        author = author,
        content = content,
        submit = submit,
    )
}

pub fn create_page() -> String {
    layout("Create post", &format!("<h1>Create post</h1>\n{}", post_form("/create", "Create", None)))
}

pub fn edit_page(post: &Post) -> String {
    let action = format!("/edit/{}", post.id);
    layout(
        "Edit post",
        &format!("<h1>Edit post</h1>\n{}", post_form(&action, "Save", Some(post))),
    )
}

pub fn error_page(message: &str) -> String {
    layout("Error", &format!("<h1>Something went wrong</h1>\n<p>{}</p>", escape(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(
            escape("<script>alert(\"x\") & 'y'</script>"),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn index_lists_posts_in_given_order_with_counts() {
        let now = Utc::now();
        let posts = vec![
            Post::new("First <b>".into(), "c".into(), "A".into(), now),
            Post::new("Second".into(), "c".into(), "B".into(), now),
        ];
        let counts = BTreeMap::from([("A".to_string(), 1), ("B".to_string(), 1)]);
        let html = index_page(&posts, PostSort::DateDesc, &counts);

        let first = html.find("First &lt;b&gt;").unwrap();
        let second = html.find("Second").unwrap();
        assert!(first < second);
        assert!(html.contains("<li>A: 1</li>"));
        assert!(html.contains("href=\"/?sort=alphabetical\""));
    }

    #[test]
    fn edit_page_prefills_fields() {
        let post = Post::new("T\"q".into(), "Body".into(), "Me".into(), Utc::now());
        let html = edit_page(&post);
        assert!(html.contains("value=\"T&quot;q\""));
        assert!(html.contains(">Body</textarea>"));
        assert!(html.contains(&format!("action=\"/edit/{}\"", post.id)));
    }
}
