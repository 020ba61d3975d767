//! HTML pages. Every function is a pure mapping from data to markup.

use crate::auth::session::{Flash, FlashKind};
use crate::users::User;

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

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<nav><a href="/">Home</a> | <a href="/profile">Profile</a> | <a href="/contact">Contact</a></nav>
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

fn notice(kind: &str, message: &str) -> String {
    format!(r#"<p class="{kind}">{}</p>"#, escape(message))
}

pub fn home() -> String {
    layout(
        "Home",
        r#"<h1>Welcome</h1>
<p><a href="/login">Log in</a> or <a href="/register">create an account</a>.</p>"#,
    )
}

pub fn contact() -> String {
    layout(
        "Contact",
        r#"<h1>Contact</h1>
<p>Questions or problems with your account? Reach out to the site administrator.</p>"#,
    )
}

pub fn login_register(login_error: Option<&str>, registration_error: Option<&str>) -> String {
    let login_error = login_error.map(|m| notice("error", m)).unwrap_or_default();
    let registration_error = registration_error
        .map(|m| notice("error", m))
        .unwrap_or_default();
    layout(
        "Login or register",
        &format!(
            r#"<h1>Log in</h1>
{login_error}
<form method="post" action="/login">
  <input name="username" placeholder="Username" required>
  <input name="password" type="password" placeholder="Password" required>
  <button type="submit">Log in</button>
</form>
<h1>Register</h1>
{registration_error}
<form method="post" action="/register">
  <input name="name" placeholder="Name" required>
  <input name="email" type="email" placeholder="Email" required>
  <input name="username" placeholder="Username" required>
  <input name="password" type="password" placeholder="Password" required>
  <button type="submit">Register</button>
</form>"#
        ),
    )
}

pub fn profile(user: &User, flash: &[Flash]) -> String {
    let notices: String = flash
        .iter()
        .map(|f| match f.kind {
            FlashKind::Success => notice("success", &f.message),
            _ => notice("error", &f.message),
        })
        .collect();
    layout(
        "Profile",
        &format!(
            r#"<h1>{name}</h1>
{notices}
<img src="{photo}" alt="Profile photo" width="160">
<dl>
  <dt>Username</dt><dd>{username}</dd>
  <dt>Email</dt><dd>{email}</dd>
</dl>
<form method="post" action="/upload" enctype="multipart/form-data">
  <input type="file" name="profilePhoto" accept="image/*">
  <button type="submit">Upload photo</button>
</form>
<form method="post" action="/delete-photo">
  <button type="submit">Delete photo</button>
</form>
<p><a href="/logout">Log out</a></p>"#,
            name = escape(&user.name),
            photo = escape(&user.profile_photo),
            username = escape(&user.username),
            email = escape(&user.email),
        ),
    )
}
