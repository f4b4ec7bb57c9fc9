//! Desktop notifications for the overtime reminder

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use notify_rust::Notification;
#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::{Timeout, Urgency};
use tracing::{debug, info, warn};

use crate::error::NotifierError;
use crate::models::{OvertimeNotification, Permission};

/// Host capability for presenting notifications, gated by a permission state.
pub trait NotificationHost: Send + Sync {
    fn permission(&self) -> Permission;

    /// Ask for permission if undecided. A decided permission is returned as is.
    fn request_permission(&self) -> Permission;

    fn present(&self, notification: &OvertimeNotification) -> Result<(), NotifierError>;
}

/// Notifications through the desktop notification server.
pub struct DesktopNotifications {
    app_name: String,
    permission: Mutex<Permission>,
    /// Last notification per tag; its id is reused so a repeat replaces the visible one.
    tagged: Mutex<HashMap<String, Tagged>>,
}

struct Tagged {
    id: u32,
    /// Set while a click handler thread is waiting on `id`.
    listening: Arc<AtomicBool>,
}

impl DesktopNotifications {
    pub fn new(app_name: &str, permission: Permission) -> Self {
        Self {
            app_name: app_name.to_string(),
            permission: Mutex::new(permission),
            tagged: Mutex::new(HashMap::new()),
        }
    }

    #[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
    fn previous_id(&self, tag: &str) -> Option<u32> {
        self.tagged.lock().ok()?.get(tag).map(|t| t.id)
    }

    /// Record the id shown for `tag`. Returns a fresh listening flag when a new
    /// click handler is needed, or `None` while one is still waiting on that id.
    #[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
    fn track(&self, tag: &str, id: u32) -> Option<Arc<AtomicBool>> {
        let mut tagged = self.tagged.lock().ok()?;
        if let Some(existing) = tagged.get(tag) {
            if existing.id == id && existing.listening.load(Ordering::SeqCst) {
                return None;
            }
        }
        let listening = Arc::new(AtomicBool::new(true));
        tagged.insert(
            tag.to_string(),
            Tagged {
                id,
                listening: Arc::clone(&listening),
            },
        );
        Some(listening)
    }

    fn set_permission(&self, permission: Permission) {
        if let Ok(mut p) = self.permission.lock() {
            *p = permission;
        }
    }
}

impl NotificationHost for DesktopNotifications {
    fn permission(&self) -> Permission {
        self.permission.lock().map(|p| *p).unwrap_or(Permission::Denied)
    }

    fn request_permission(&self) -> Permission {
        let current = self.permission();
        if current.is_decided() {
            return current;
        }
        let decided = probe_notification_server();
        self.set_permission(decided);
        decided
    }

    fn present(&self, notification: &OvertimeNotification) -> Result<(), NotifierError> {
        if self.permission() != Permission::Granted {
            return Err(NotifierError::PermissionUnavailable);
        }

        let mut builder = Notification::new();
        builder
            .appname(&self.app_name)
            .summary(&notification.title)
            .body(&notification.body)
            .icon(&notification.icon);

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            if let Some(id) = self.previous_id(&notification.tag) {
                builder.id(id);
            }
            builder.action("default", "Check-out");
            if notification.require_interaction {
                builder.timeout(Timeout::Never).urgency(Urgency::Critical);
            }
        }

        let handle = builder
            .show()
            .map_err(|e| NotifierError::Presentation(e.to_string()))?;

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            match self.track(&notification.tag, handle.id()) {
                Some(listening) => {
                    spawn_click_handler(handle, notification.click_url.clone(), listening)
                }
                None => debug!(tag = %notification.tag, "Click handler already waiting"),
            }
        }
        #[cfg(not(all(unix, not(target_os = "macos"))))]
        drop(handle);

        info!(tag = %notification.tag, "Overtime notification shown");
        Ok(())
    }
}

/// Ask the notification server who it is; an answer means notifications can be shown.
#[cfg(all(unix, not(target_os = "macos")))]
fn probe_notification_server() -> Permission {
    match notify_rust::get_server_information() {
        Ok(info) => {
            debug!(server = %info.name, vendor = %info.vendor, "Notification server found");
            Permission::Granted
        }
        Err(e) => {
            warn!("No notification server available: {e}");
            Permission::Denied
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn probe_notification_server() -> Permission {
    debug!("Assuming notification support on this platform");
    Permission::Granted
}

/// Wait on a background thread for the click, then open the checkout page and dismiss.
/// `listening` is cleared once the notification is clicked or closed.
#[cfg(all(unix, not(target_os = "macos")))]
fn spawn_click_handler(
    handle: notify_rust::NotificationHandle,
    url: String,
    listening: Arc<AtomicBool>,
) {
    std::thread::spawn(move || {
        handle.wait_for_action(|action| match action {
            "default" | "clicked" => {
                debug!(%url, "Notification clicked");
                if let Err(e) = std::process::Command::new("xdg-open").arg(&url).spawn() {
                    warn!("Failed to open {url}: {e}");
                }
            }
            _ => {}
        });
        listening.store(false, Ordering::SeqCst);
    });
}
