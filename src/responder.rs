//! Builds complete HTTP error responses with a small styled HTML body.

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn build_error_html(
    error_code: u16,
    title: &str,
    heading: &str,
    message: &str,
    blocked_terms: &[String],
    color: &str,
) -> String {
    let mut terms_html = String::new();
    if !blocked_terms.is_empty() {
        terms_html.push_str("<ul>");
        for term in blocked_terms {
            terms_html.push_str(&format!("<li>{}</li>", html_escape(term)));
        }
        terms_html.push_str("</ul>");
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title>\n\
         <style>body{{font-family:sans-serif;background:#f5f5f5;color:#222;\
         padding:2rem}}h1{{color:{color}}}</style>\n</head>\n<body>\n\
         <h1>{error_code} {heading}</h1>\n<p>{message}</p>\n{terms_html}\n\
         </body>\n</html>\n",
        title = html_escape(title),
        heading = html_escape(heading),
        message = html_escape(message),
    )
}

fn build_response(status_line: &str, body: &str) -> Vec<u8> {
    let header = format!(
        "{status_line}\r\nContent-Type: text/html; charset=UTF-8\r\n\
         Content-Length: {len}\r\nConnection: close\r\n\
         Cache-Control: no-store\r\n\r\n",
        len = body.len(),
    );
    let mut out = header.into_bytes();
    out.extend_from_slice(body.as_bytes());
    out
}

pub fn build_403(blocked_terms: &[String]) -> Vec<u8> {
    let body = build_error_html(
        403,
        "403 Forbidden",
        "Forbidden",
        "Your request contains content that is not permitted through this proxy.",
        blocked_terms,
        "#b00020",
    );
    build_response("HTTP/1.1 403 Forbidden", &body)
}

pub fn build_503(blocked_terms: &[String]) -> Vec<u8> {
    let body = build_error_html(
        503,
        "503 Service Unavailable",
        "Service Unavailable",
        "The response from the destination server contains content that is not permitted through this proxy.",
        blocked_terms,
        "#b06000",
    );
    build_response("HTTP/1.1 503 Service Unavailable", &body)
}

pub fn build_502(reason: &str) -> Vec<u8> {
    let message = if reason.is_empty() {
        "The proxy could not reach the destination server.".to_string()
    } else {
        format!(
            "The proxy could not reach the destination server: {reason}",
            reason = reason
        )
    };
    let body = build_error_html(502, "502 Bad Gateway", "Bad Gateway", &message, &[], "#555");
    build_response("HTTP/1.1 502 Bad Gateway", &body)
}

pub fn build_400(reason: &str) -> Vec<u8> {
    let message = if reason.is_empty() {
        "The request could not be understood.".to_string()
    } else {
        format!("The request could not be understood: {reason}", reason = reason)
    };
    let body = build_error_html(400, "400 Bad Request", "Bad Request", &message, &[], "#555");
    build_response("HTTP/1.1 400 Bad Request", &body)
}
