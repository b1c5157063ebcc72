use tryst_shared::errors::AppResult;

use super::{show_text, Caller};
use crate::transport::{Button, Keyboard};
use crate::AppState;

const WELCOME: &str = "👋 Welcome to Tryst!\n\nHere you can:\n• create your profile 📝\n• browse other profiles 👤\n• talk to people you like 💬\n\nPick an option below:";
const HOME: &str = "👋 Welcome back! Pick an option below:";

pub fn main_menu() -> Keyboard {
    Keyboard::new()
        .button("👤 Browse profiles", "explore:0")
        .button("💘 Smart matches", "matches")
        .row(vec![
            Button::new("📝 Create / edit profile", "create_profile"),
            Button::new("⭐ Favorites", "favorites"),
        ])
        .button("💬 Inbox", "inbox")
        .button("⚙️ Settings", "settings")
}

/// `/start`: greets the user with the main menu.
pub async fn welcome(state: &AppState, caller: &Caller) -> AppResult<()> {
    let channels = state.repo.force_channels().await?;
    let mut text = WELCOME.to_string();
    if !channels.is_empty() {
        text.push_str("\n\n📢 Don't miss our channels:\n");
        for channel in &channels {
            text.push_str(&format!("• {channel}\n"));
        }
    }
    state
        .messenger
        .send_text(caller.chat_id, &text, Some(main_menu()))
        .await?;
    Ok(())
}

/// The `start` button: back to the main menu.
pub async fn home(state: &AppState, caller: &Caller) -> AppResult<()> {
    show_text(state, caller, HOME, Some(main_menu())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn menu_tags_are_routable() {
        let tags: Vec<_> = main_menu()
            .buttons()
            .map(|b| b.data.split(':').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(tags, vec!["explore", "matches", "create_profile", "favorites", "inbox", "settings"]);
    }

    #[tokio::test]
    async fn welcome_lists_channels() {
        let (state, messenger) = testing::state();
        state.repo.add_force_channel("@tryst_news").await.unwrap();
        let caller = Caller { account_id: 5, chat_id: 5, action: None, message: None, name: None };

        welcome(&state, &caller).await.unwrap();
        let sent = messenger.last_to(5).unwrap();
        assert!(sent.body().contains("@tryst_news"));
        assert!(sent.keyboard().is_some());
    }
}
