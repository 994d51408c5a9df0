use crate::model::CharacterRecord;
use crate::normalize::AliasTable;

/// Display names shipped with the binary so search and resolution keep working
/// when the upstream has never been reachable.
pub const DEFAULT_ROSTER: &[&str] = &[
    "Aatrox", "Ahri", "Akali", "Alistar", "Amumu", "Anivia", "Annie", "Ashe",
    "Aurelion Sol", "Azir", "Bard", "Blitzcrank", "Brand", "Braum", "Caitlyn",
    "Camille", "Cassiopeia", "Cho'Gath", "Corki", "Darius", "Diana", "Dr. Mundo",
    "Draven", "Ekko", "Elise", "Evelynn", "Ezreal", "Fiddlesticks", "Fiora",
    "Fizz", "Galio", "Gangplank", "Garen", "Gnar", "Gragas", "Graves", "Hecarim",
    "Heimerdinger", "Illaoi", "Irelia", "Ivern", "Janna", "Jarvan IV", "Jax",
    "Jayce", "Jhin", "Jinx", "Kalista", "Karma", "Karthus", "Kassadin", "Katarina",
    "Kayle", "Kayn", "Kennen", "Kha'Zix", "Kindred", "Kled", "Kog'Maw", "LeBlanc",
    "Lee Sin", "Leona", "Lissandra", "Lucian", "Lulu", "Lux", "Malphite", "Malzahar",
    "Maokai", "Master Yi", "Miss Fortune", "Mordekaiser", "Morgana", "Nami", "Nasus",
    "Nautilus", "Nidalee", "Nocturne", "Nunu", "Olaf", "Orianna", "Ornn", "Pantheon",
    "Poppy", "Quinn", "Rakan", "Rammus", "Rek'Sai", "Renekton", "Rengar", "Riven",
    "Rumble", "Ryze", "Sejuani", "Shaco", "Shen", "Shyvana", "Singed", "Sion", "Sivir",
    "Skarner", "Sona", "Soraka", "Swain", "Syndra", "Tahm Kench", "Taliyah", "Talon",
    "Taric", "Teemo", "Thresh", "Tristana", "Trundle", "Tryndamere", "Twisted Fate",
    "Twitch", "Udyr", "Urgot", "Varus", "Vayne", "Veigar", "Vel'Koz", "Vi", "Viktor",
    "Vladimir", "Volibear", "Warwick", "Wukong", "Xayah", "Xerath", "Xin Zhao", "Yasuo",
    "Yorick", "Zac", "Zed", "Ziggs", "Zilean", "Zyra",
];

/// Builds minimal records for [`DEFAULT_ROSTER`], in roster order.
///
/// Ids come from the alias table when it knows the name, otherwise from the
/// display name with spaces and punctuation removed.
pub fn default_roster(aliases: &AliasTable) -> Vec<CharacterRecord> {
    DEFAULT_ROSTER
        .iter()
        .map(|name| {
            let id = aliases
                .lookup(name)
                .map(str::to_string)
                .unwrap_or_else(|| name.chars().filter(|c| c.is_alphanumeric()).collect());
            CharacterRecord {
                image: format!("{id}.png"),
                id,
                key: None,
                name: (*name).to_string(),
                title: String::new(),
                tags: Default::default(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_ids_use_asset_spelling() {
        let roster = default_roster(&AliasTable::builtin());
        let find = |name: &str| roster.iter().find(|c| c.name == name).map(|c| c.id.clone());
        assert_eq!(find("Wukong").as_deref(), Some("MonkeyKing"));
        assert_eq!(find("Kha'Zix").as_deref(), Some("Khazix"));
        assert_eq!(find("Dr. Mundo").as_deref(), Some("DrMundo"));
        assert_eq!(find("Fiddlesticks").as_deref(), Some("Fiddlesticks"));
    }
}
