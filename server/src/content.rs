/// One entry in the card catalog. Dealt instances get stamped ids; the
/// template id stays stable across games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    pub id: String,
    pub label: String,
    pub image_url: String,
}

/// Static game content, read-only after construction. The server runs
/// on the builtin set; tests inject smaller catalogs.
#[derive(Debug, Clone)]
pub struct Content {
    pub cards: Vec<CardTemplate>,
    pub prompts: Vec<String>,
}

const BUILTIN_CARDS: &[(&str, &str)] = &[
    ("distracted-boyfriend", "Distracted Boyfriend"),
    ("woman-yelling-at-cat", "Woman Yelling at a Cat"),
    ("this-is-fine", "This Is Fine"),
    ("drake-approves", "Drake Approves"),
    ("surprised-pikachu", "Surprised Pikachu"),
    ("hide-the-pain", "Hide the Pain Harold"),
    ("success-kid", "Success Kid"),
    ("roll-safe", "Roll Safe"),
    ("expanding-brain", "Expanding Brain"),
    ("two-buttons", "Two Buttons"),
    ("change-my-mind", "Change My Mind"),
    ("is-this-a-pigeon", "Is This a Pigeon"),
    ("mocking-spongebob", "Mocking SpongeBob"),
    ("doge", "Doge"),
    ("grumpy-cat", "Grumpy Cat"),
    ("stonks", "Stonks"),
];

const BUILTIN_PROMPTS: &[&str] = &[
    "When the WiFi dies mid-presentation",
    "Monday morning, 8 AM standup",
    "The group chat after someone says \"we need to talk\"",
    "Me explaining my browser tab situation",
    "When the waiter says \"enjoy your meal\" and you say \"you too\"",
    "Opening the fridge for the fifth time hoping something changed",
    "When the code works on the first try",
    "Reading the terms and conditions",
    "When someone spoils the season finale",
    "Deadline in one hour, motivation at zero",
    "When autocorrect betrays you in a serious text",
    "The last slice of pizza at a party",
    "Checking your bank account after the weekend",
    "When your alarm goes off and it's still dark outside",
    "Trying to look busy when the boss walks by",
    "When the meeting could have been an email",
    "Accidentally liking a photo from 2014",
    "When the GPS says \"recalculating\" for the third time",
    "Replying \"sounds good\" to a message you didn't read",
    "When you wave back at someone who wasn't waving at you",
];

impl Content {
    pub fn builtin() -> Self {
        let cards = BUILTIN_CARDS
            .iter()
            .map(|(id, label)| CardTemplate {
                id: (*id).to_string(),
                label: (*label).to_string(),
                image_url: format!("/cards/{}.png", id),
            })
            .collect();
        let prompts = BUILTIN_PROMPTS.iter().map(|p| (*p).to_string()).collect();
        Content { cards, prompts }
    }
}
