//! Interactive kiosk front-end.
//!
//! Pure presentation: collects raw form input, forwards it to the core,
//! and renders the signals that come back. No authorization logic lives
//! here. Screen selection is an explicit value; transitions are a pure
//! function of (current screen, event), not ambient mutable state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use crate::audit::{decode_history, matches_search, AuditLogger};
use crate::config::Config;
use crate::directory::{decode_users, UserDirectory};
use crate::error::DenyReason;
use crate::signal::{signal_channel, SignalReceiver, TerminalSignal};
use crate::store::RecordStore;
use crate::terminal::EntryTerminal;

/// Typing this at the name prompt opens the admin login, standing in for
/// the kiosk's hidden shield button.
const ADMIN_COMMAND: &str = "/admin";

/// Which screen the kiosk is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Terminal,
    Dashboard { admin_name: String },
}

/// Navigation events produced by the screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    AdminAuthenticated { display_name: String },
    LoggedOut,
}

/// Screen transitions as a pure function.
pub fn next_screen(_current: Screen, event: ScreenEvent) -> Screen {
    match event {
        ScreenEvent::AdminAuthenticated { display_name } => Screen::Dashboard {
            admin_name: display_name,
        },
        ScreenEvent::LoggedOut => Screen::Terminal,
    }
}

/// User-facing text for a signal, keyed off the stable message keys.
pub fn render_message(signal: &TerminalSignal) -> String {
    match signal {
        TerminalSignal::EntryGranted { display_name } => {
            format!("BIENVENIDO {}", display_name.to_uppercase())
        }
        TerminalSignal::EntryDenied { reason } => match reason {
            DenyReason::EmptyInput => "Complete RUT y PIN".into(),
            DenyReason::UserNotFound => "Usuario no encontrado".into(),
            DenyReason::BadCredentials => "Credenciales Incorrectas".into(),
        },
        TerminalSignal::EntryIgnored => "La puerta ya está abierta".into(),
        TerminalSignal::DoorRelocked => "Puerta cerrada".into(),
        TerminalSignal::AdminGranted { display_name } => {
            format!("Acceso Docente: {display_name}")
        }
        TerminalSignal::AdminDenied => "Acceso Denegado".into(),
        TerminalSignal::UserSaved => "Guardado".into(),
        TerminalSignal::UserDeleted => "Eliminado".into(),
        TerminalSignal::ValidationFailed { .. } => "Complete todo".into(),
    }
}

/// Run the kiosk until interrupted.
pub async fn run(store: Arc<dyn RecordStore>, config: &Config) -> Result<()> {
    let (tx, mut rx) = signal_channel();
    let terminal = EntryTerminal::new(
        store.clone(),
        Duration::from_millis(config.terminal.dwell_ms),
        tx.clone(),
    );
    let directory = UserDirectory::new(store.clone(), tx);
    let audit = AuditLogger::new(store);

    let mut screen = Screen::Terminal;
    loop {
        let event = match &screen {
            Screen::Terminal => terminal_screen(&terminal, &mut rx).await?,
            Screen::Dashboard { admin_name } => {
                dashboard_screen(admin_name, &directory, &audit, &mut rx).await?
            }
        };
        if let Some(event) = event {
            screen = next_screen(screen, event);
        }
    }
}

/// The public access screen: one form submission per pass.
async fn terminal_screen(
    terminal: &EntryTerminal,
    rx: &mut SignalReceiver,
) -> Result<Option<ScreenEvent>> {
    println!();
    println!("{}", style("FABENTRY — CONTROL DE ACCESO").cyan().bold());

    let name: String = Input::new()
        .with_prompt("Nombre Completo")
        .allow_empty(true)
        .interact_text()?;

    if name.trim() == ADMIN_COMMAND {
        return admin_login(terminal, rx).await;
    }

    let id: String = Input::new()
        .with_prompt("RUT (Sin puntos)")
        .allow_empty(true)
        .interact_text()?;
    let pin = Password::new()
        .with_prompt("PIN")
        .allow_empty_password(true)
        .interact()?;

    match terminal.submit_entry(&name, &id, &pin).await {
        Ok(()) => render_entry_outcome(rx).await,
        Err(e) => {
            tracing::warn!("entry attempt failed against the store: {e}");
            println!("{}", style("Acceso Denegado").red());
        }
    }
    Ok(None)
}

/// Wait for the outcome of a submitted attempt and, on a grant, for the
/// relock that ends the cycle.
async fn render_entry_outcome(rx: &mut SignalReceiver) {
    let Some(signal) = rx.recv().await else {
        return;
    };
    match &signal {
        TerminalSignal::EntryGranted { .. } => {
            println!("{}", style(render_message(&signal)).green().bold());
            while let Some(signal) = rx.recv().await {
                if signal == TerminalSignal::DoorRelocked {
                    println!("{}", style(render_message(&signal)).dim());
                    break;
                }
            }
        }
        _ => println!("{}", style(render_message(&signal)).red()),
    }
}

/// The hidden teacher login dialog.
async fn admin_login(
    terminal: &EntryTerminal,
    rx: &mut SignalReceiver,
) -> Result<Option<ScreenEvent>> {
    println!("{}", style("Acceso Docente").cyan());
    let id: String = Input::new().with_prompt("RUT Docente").interact_text()?;
    let pin = Password::new().with_prompt("PIN").interact()?;

    match terminal.submit_admin(&id, &pin).await {
        Ok(Some(record)) => {
            let _ = rx.try_recv(); // consume the AdminGranted signal
            Ok(Some(ScreenEvent::AdminAuthenticated {
                display_name: record.display_name,
            }))
        }
        Ok(None) => {
            let _ = rx.try_recv();
            println!("{}", style("Acceso Denegado").red());
            Ok(None)
        }
        Err(e) => {
            tracing::warn!("admin login failed against the store: {e}");
            println!("{}", style("Acceso Denegado").red());
            Ok(None)
        }
    }
}

/// The teacher dashboard: history, users, creation, logout.
async fn dashboard_screen(
    admin_name: &str,
    directory: &UserDirectory,
    audit: &AuditLogger,
    rx: &mut SignalReceiver,
) -> Result<Option<ScreenEvent>> {
    println!();
    println!(
        "{} {}",
        style("PANEL ADMIN —").cyan().bold(),
        style(admin_name).bold()
    );

    let choice = Select::new()
        .with_prompt("Sección")
        .items(&["Historial", "Usuarios", "Crear Usuario", "Salir"])
        .default(0)
        .interact()?;

    match choice {
        0 => show_history(audit).await,
        1 => manage_users(directory, rx).await,
        2 => create_user_form(directory, rx).await,
        _ => return Ok(Some(ScreenEvent::LoggedOut)),
    }
    Ok(None)
}

async fn show_history(audit: &AuditLogger) {
    let query: String = match Input::new()
        .with_prompt("Buscar")
        .allow_empty(true)
        .interact_text()
    {
        Ok(q) => q,
        Err(_) => return,
    };

    match audit.subscribe().await {
        Ok(view) => {
            let entries = decode_history(&view.borrow());
            for entry in entries.iter().filter(|e| matches_search(e, &query)) {
                println!(
                    "  {}  {}  {}",
                    style(&entry.timestamp).dim(),
                    style(&entry.name).bold(),
                    style(&entry.identifier).dim()
                );
            }
        }
        Err(e) => {
            tracing::warn!("history read failed: {e}");
            println!("{}", style("Historial no disponible").red());
        }
    }
}

async fn manage_users(directory: &UserDirectory, rx: &mut SignalReceiver) {
    let users = match directory.subscribe().await {
        Ok(list) => decode_users(&list.borrow()),
        Err(e) => {
            tracing::warn!("user list read failed: {e}");
            println!("{}", style("Usuarios no disponibles").red());
            return;
        }
    };

    let mut items: Vec<String> = users
        .iter()
        .map(|u| {
            format!(
                "{} — {} • {}",
                u.record.display_name,
                u.identifier,
                u.record.role.as_str()
            )
        })
        .collect();
    items.push("← Volver".into());

    let Ok(choice) = Select::new()
        .with_prompt("Usuarios")
        .items(&items)
        .default(0)
        .interact()
    else {
        return;
    };
    if choice >= users.len() {
        return;
    }

    let target = &users[choice];
    let confirmed = Confirm::new()
        .with_prompt(format!("¿Eliminar a {}?", target.record.display_name))
        .default(false)
        .interact()
        .unwrap_or(false);
    if confirmed {
        match directory.delete_user(&target.identifier).await {
            Ok(()) => {
                if let Ok(signal) = rx.try_recv() {
                    println!("{}", style(render_message(&signal)).green());
                }
            }
            Err(e) => {
                tracing::warn!("delete failed: {e}");
                println!("{}", style("No se pudo eliminar").red());
            }
        }
    }
}

async fn create_user_form(directory: &UserDirectory, rx: &mut SignalReceiver) {
    let name: String = Input::new()
        .with_prompt("Nombre Completo")
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    let id: String = Input::new()
        .with_prompt("RUT (Identificador)")
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    let pin: String = Input::new()
        .with_prompt("PIN")
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    let is_teacher = Confirm::new()
        .with_prompt("¿Es Docente (Admin)?")
        .default(false)
        .interact()
        .unwrap_or(false);

    match directory.create_user(&name, &id, &pin, is_teacher).await {
        Ok(_) => {
            if let Ok(signal) = rx.try_recv() {
                println!("{}", style(render_message(&signal)).green());
            }
        }
        Err(e) => {
            if let Ok(signal) = rx.try_recv() {
                println!("{}", style(render_message(&signal)).red());
            } else {
                tracing::warn!("create user failed: {e}");
                println!("{}", style("No se pudo guardar").red());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn router_moves_between_terminal_and_dashboard() {
        let screen = next_screen(
            Screen::Terminal,
            ScreenEvent::AdminAuthenticated {
                display_name: "Ana Pérez".into(),
            },
        );
        assert_eq!(
            screen,
            Screen::Dashboard {
                admin_name: "Ana Pérez".into()
            }
        );

        let screen = next_screen(screen, ScreenEvent::LoggedOut);
        assert_eq!(screen, Screen::Terminal);
    }

    #[test]
    fn messages_match_product_wording() {
        assert_eq!(
            render_message(&TerminalSignal::EntryDenied {
                reason: DenyReason::BadCredentials
            }),
            "Credenciales Incorrectas"
        );
        assert_eq!(
            render_message(&TerminalSignal::EntryDenied {
                reason: DenyReason::UserNotFound
            }),
            "Usuario no encontrado"
        );
        assert_eq!(render_message(&TerminalSignal::AdminDenied), "Acceso Denegado");
        assert_eq!(render_message(&TerminalSignal::UserSaved), "Guardado");
        assert_eq!(render_message(&TerminalSignal::UserDeleted), "Eliminado");
        assert_eq!(
            render_message(&TerminalSignal::ValidationFailed {
                reason: ValidationError::IncompleteForm
            }),
            "Complete todo"
        );
    }

    #[test]
    fn welcome_banner_uses_resolved_name() {
        let message = render_message(&TerminalSignal::EntryGranted {
            display_name: "Juan Soto".into(),
        });
        assert_eq!(message, "BIENVENIDO JUAN SOTO");
    }
}
