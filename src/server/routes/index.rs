use axum::response::Html;

static START_FORM: &str = include_str!("../../../templates/start_form.html");

/// GET / - upload form
pub async fn index() -> Html<&'static str> {
    Html(START_FORM)
}
