use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use gloo::timers::future::TimeoutFuture;
use myfuture_core::reminder::{
  NotificationPermission,
  Reminder,
  ReminderDriver
};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use yew::Callback;

const ICON: &str = "/favicon.ico";
const SOUND_URL: &str = "https://assets.mixkit.co/sfx/preview/mixkit-alarm-digital-clock-beep-989.mp3";
/// Largest delay `setTimeout` honours.
const MAX_TIMEOUT_MS: u64 =
  i32::MAX as u64;

pub fn browser_permission()
-> NotificationPermission {
  let Some(window) = web_sys::window()
  else {
    return NotificationPermission::Unsupported;
  };

  let has_notification =
    js_sys::Reflect::has(
      window.as_ref(),
      &wasm_bindgen::JsValue::from_str(
        "Notification"
      )
    )
    .ok()
    .unwrap_or(false);

  if !has_notification {
    return NotificationPermission::Unsupported;
  }

  match web_sys::Notification::permission()
  {
    | web_sys::NotificationPermission::Default => {
      NotificationPermission::Default
    }
    | web_sys::NotificationPermission::Granted => {
      NotificationPermission::Granted
    }
    | web_sys::NotificationPermission::Denied => {
      NotificationPermission::Denied
    }
    | _ => {
      NotificationPermission::Unsupported
    }
  }
}

/// Prompts once when the browser has no
/// answer yet. `on_done` always receives
/// the resulting permission.
pub fn request_permission(
  on_done: Callback<
    NotificationPermission
  >
) {
  let current = browser_permission();
  if !current.should_prompt() {
    if current
      == NotificationPermission::Unsupported
    {
      tracing::warn!(
        "browser notification API \
         unsupported in this runtime"
      );
    }
    on_done.emit(current);
    return;
  }

  match web_sys::Notification::request_permission()
  {
    | Ok(promise) => {
      wasm_bindgen_futures::spawn_local(
        async move {
          let result =
            wasm_bindgen_futures::JsFuture::from(
              promise
            )
            .await;
          if let Err(error) = result {
            tracing::error!(
              error = ?error,
              "notification permission \
               request failed"
            );
          }
          let updated =
            browser_permission();
          tracing::info!(
            permission = %updated,
            "notification permission \
             request completed"
          );
          on_done.emit(updated);
        }
      );
    }
    | Err(error) => {
      tracing::error!(
        error = ?error,
        "failed to request notification permission"
      );
      on_done.emit(current);
    }
  }
}

/// Cancellation flag shared with the
/// sleeping reminder future.
pub struct TimeoutHandle {
  cancelled: Rc<Cell<bool>>
}

/// Browser timers plus the Notification
/// API.
pub struct BrowserDriver;

impl ReminderDriver for BrowserDriver {
  type Handle = TimeoutHandle;

  fn permission(
    &self
  ) -> NotificationPermission {
    browser_permission()
  }

  fn arm(
    &mut self,
    delay: Duration,
    reminder: Reminder
  ) -> TimeoutHandle {
    let cancelled =
      Rc::new(Cell::new(false));
    let flag = cancelled.clone();
    let mut remaining =
      u64::try_from(delay.as_millis())
        .unwrap_or(u64::MAX);

    wasm_bindgen_futures::spawn_local(
      async move {
        while remaining > 0 {
          let step =
            remaining.min(MAX_TIMEOUT_MS);
          TimeoutFuture::new(
            step as u32
          )
          .await;
          if flag.get() {
            return;
          }
          remaining -= step;
        }
        show_reminder(&reminder);
      }
    );

    TimeoutHandle { cancelled }
  }

  fn disarm(
    &mut self,
    handle: TimeoutHandle
  ) {
    handle.cancelled.set(true);
  }
}

fn show_reminder(reminder: &Reminder) {
  if browser_permission()
    != NotificationPermission::Granted
  {
    tracing::debug!(
      "skipping reminder because \
       permission is not granted"
    );
    return;
  }

  let options =
    web_sys::NotificationOptions::new();
  options.set_body(&reminder.body());
  options.set_icon(ICON);

  match web_sys::Notification::new_with_options(
    reminder.heading(),
    &options
  ) {
    | Ok(notification) => {
      let target = notification.clone();
      let onclick = Closure::<dyn FnMut()>::new(
        move || {
          if let Some(window) =
            web_sys::window()
            && let Err(error) =
              window.focus()
          {
            tracing::debug!(
              error = ?error,
              "window focus refused"
            );
          }
          target.close();
        }
      );
      notification.set_onclick(Some(
        onclick.as_ref().unchecked_ref()
      ));
      onclick.forget();

      tracing::info!(
        title = %reminder.title,
        "emitted reminder notification"
      );
      play_sound();
    }
    | Err(error) => {
      tracing::error!(
        error = ?error,
        title = %reminder.title,
        "failed to emit reminder notification"
      );
    }
  }
}

fn play_sound() {
  let audio =
    match web_sys::HtmlAudioElement::new_with_src(
      SOUND_URL
    ) {
      | Ok(audio) => audio,
      | Err(error) => {
        tracing::debug!(
          error = ?error,
          "could not create reminder sound"
        );
        return;
      }
    };

  match audio.play() {
    | Ok(promise) => {
      wasm_bindgen_futures::spawn_local(
        async move {
          if let Err(error) =
            wasm_bindgen_futures::JsFuture::from(
              promise
            )
            .await
          {
            tracing::debug!(
              error = ?error,
              "could not play reminder sound"
            );
          }
        }
      );
    }
    | Err(error) => {
      tracing::debug!(
        error = ?error,
        "could not play reminder sound"
      );
    }
  }
}
