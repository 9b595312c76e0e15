use std::fmt::Write;

use crate::catalog::Movie;
use super::state::{SearchPanel, TrendingPanel, ViewSnapshot, NO_POSTER_URL};

const SPINNER: &str = r#"<div role="status" class="spinner">Loading...</div>"#;

// Drives the view session the page was rendered from: keystrokes go to the
// session input, and the server-rendered panels are polled back in. Pages
// rendered without a session fall back to plain form submits.
const SESSION_SCRIPT: &str = r#"<script>
(() => {
  const form = document.getElementById('search');
  const input = form.querySelector('input');
  const panels = document.getElementById('panels');
  const json = { 'Content-Type': 'application/json' };
  let id = panels.dataset.session;
  if (!id) return;
  form.addEventListener('submit', (e) => e.preventDefault());
  const send = () => fetch(`/api/sessions/${id}/input`, {
    method: 'PUT',
    headers: json,
    body: JSON.stringify({ text: input.value }),
  });
  input.addEventListener('input', send);
  if (input.value !== input.defaultValue) send();
  const timer = setInterval(async () => {
    const r = await fetch(`/api/sessions/${id}/html`);
    if (r.ok) {
      panels.innerHTML = await r.text();
      return;
    }
    if (r.status !== 404) return;
    // Dropped while idle: carry on in a new session seeded with the input.
    const c = await fetch('/api/sessions', {
      method: 'POST',
      headers: json,
      body: JSON.stringify({ query: input.value }),
    });
    if (c.ok) id = (await c.json()).id;
    else clearInterval(timer);
  }, 300);
  window.addEventListener('pagehide', () => fetch(`/api/sessions/${id}`, { method: 'DELETE', keepalive: true }));
})();
</script>"#;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// The full page.
pub fn render_page(snapshot: &ViewSnapshot, image_base: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Filmlytics</title>\n</head>\n<body>\n<main>\n");
    html.push_str("<div class=\"pattern\"></div>\n<div class=\"wrapper\">\n");
    html.push_str("<img src=\"/logo.svg\" alt=\"Filmlytics Logo\" class=\"logo\">\n");
    html.push_str("<header>\n<img src=\"/hero.png\" alt=\"Hero Banner\">\n");
    html.push_str("<h1>Find <span class=\"text-gradient\">Movies</span> You'll Love without Any Hassle</h1>\n");
    let _ = write!(
        html,
        "<form id=\"search\" class=\"search\" method=\"get\" action=\"/\">\
         <img src=\"/search.svg\" alt=\"search\">\
         <input type=\"text\" name=\"query\" placeholder=\"Search through thousands of movies\" value=\"{}\" autocomplete=\"off\">\
         </form>\n",
        escape(&snapshot.search_term)
    );
    html.push_str("</header>\n");
    let _ = writeln!(html, "<div id=\"panels\" data-session=\"{}\">", escape(&snapshot.id));
    html.push_str(&render_panels(snapshot, image_base));
    html.push_str("</div>\n</div>\n</main>\n");
    html.push_str(SESSION_SCRIPT);
    html.push_str("\n</body>\n</html>\n");
    html
}

/// The trending and results sections, without the surrounding page.
pub fn render_panels(snapshot: &ViewSnapshot, image_base: &str) -> String {
    let mut html = String::new();
    html.push_str(&render_trending(&snapshot.trending));
    html.push_str(&render_search(&snapshot.search, image_base));
    html
}

fn render_trending(panel: &TrendingPanel) -> String {
    match panel {
        TrendingPanel::Loading => format!("{}\n", SPINNER),
        TrendingPanel::Hidden => String::new(),
        TrendingPanel::List { entries } => {
            let mut html = String::from("<section class=\"trending\">\n<h2>Trending Movies</h2>\n<ul>\n");
            for entry in entries {
                let _ = writeln!(
                    html,
                    "<li id=\"{}\"><p>{}</p><img src=\"{}\" alt=\"{}\"></li>",
                    escape(&entry.id),
                    entry.rank,
                    escape(&entry.poster_url),
                    escape(&entry.search_term)
                );
            }
            html.push_str("</ul>\n</section>\n");
            html
        }
    }
}

fn render_search(panel: &SearchPanel, image_base: &str) -> String {
    let mut html = String::from("<section class=\"all-movies\">\n<h2>All Movies</h2>\n");
    match panel {
        SearchPanel::Loading => {
            html.push_str(SPINNER);
            html.push('\n');
        }
        SearchPanel::Error { message } | SearchPanel::Empty { message } => {
            let _ = writeln!(html, "<p class=\"text-red-500\">{}</p>", escape(message));
        }
        SearchPanel::Results { movies } => {
            html.push_str("<ul>\n");
            for movie in movies {
                html.push_str(&render_movie_card(movie, image_base));
            }
            html.push_str("</ul>\n");
        }
    }
    html.push_str("</section>\n");
    html
}

fn render_movie_card(movie: &Movie, image_base: &str) -> String {
    let title = movie.title().unwrap_or("Untitled");
    let poster = movie
        .poster()
        .map(|p| format!("{}{}", image_base, p))
        .unwrap_or_else(|| NO_POSTER_URL.to_string());
    let rating = movie
        .vote_average()
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "N/A".to_string());

    let mut html = String::new();
    let _ = write!(
        html,
        "<li class=\"movie-card\" id=\"movie-{}\"><img src=\"{}\" alt=\"{}\"><div class=\"mt-4\"><h3>{}</h3><div class=\"content\">",
        movie.id,
        escape(&poster),
        escape(title),
        escape(title)
    );
    let _ = write!(html, "<div class=\"rating\"><img src=\"/star.svg\" alt=\"Star Icon\"><p>{}</p></div>", rating);
    let _ = write!(
        html,
        "<span>•</span><p class=\"lang\">{}</p><span>•</span><p class=\"year\">{}</p>",
        escape(movie.original_language().unwrap_or("")),
        escape(movie.release_year().unwrap_or("N/A"))
    );
    html.push_str("</div></div></li>\n");
    html
}
