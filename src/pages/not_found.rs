use leptos::prelude::*;

/// Unknown routes keep the dark backdrop and point back to the demo.
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found hero">
			<h1>"No fibers run here"</h1>
			<p class="subtitle">"This route does not exist."</p>
			<a href="/">"Back to the background demo"</a>
		</div>
	}
}
