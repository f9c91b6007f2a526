mod app;
mod components;
mod notify;
mod storage;

fn main() {
  console_error_panic_hook::set_once();
  wasm_tracing::set_as_global_default();

  tracing::info!(
    "starting My Future frontend"
  );

  let document = web_sys::window()
    .and_then(|window| {
      window.document()
    })
    .expect("missing document");
  document.set_title("My Future");

  let mount = document
    .get_element_by_id("app")
    .expect(
      "missing #app mount element"
    );

  yew::Renderer::<app::App>::with_root(
    mount
  )
  .render();
}
