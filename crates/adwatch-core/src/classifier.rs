//! Advertisement classifier
//!
//! A fixed heuristic tuned on a labelled dataset of Russian channel posts. Text must
//! carry at least one ad-disclosure marker, then enough advertising-register words
//! for its length. Changing [`AD_WORDS`] or the threshold table changes behaviour.

/// Ad-disclosure markers; a post without any of them is never an advertisement
pub const REQUIRED_MARKERS: &[&str] = &["erid", "инн", "интеграция"];

/// Advertising vocabulary, matched as lowercase substrings.
///
/// Some words appear twice and therefore count twice.
pub const AD_WORDS: &[&str] = &[
    "авторский", "авторского", "авторская", "авторской", "авторские", "авторских", "автор",
    "автора", "авторы", "акция", "акции", "актуально", "актуальный", "актуальная", "актуальные",
    "актуальной", "актуальным", "бесплатно", "бесплатный", "бесплатом", "бесплатных",
    "бесплатные", "бизнес", "бизнесу", "бизнеса", "бизнесе", "бизнесмен", "бизнесменом",
    "бизнесмена", "бизнесмены", "бот", "боте", "боту", "бота", "бонус", "бонусы", "бонусов",
    "бонусный", "бронируй", "бронируйте", "вебинар", "вебинара", "вебинары", "войти", "входи",
    "вход", "входа", "врывайся", "врывайтесь", "воспользоваться", "воспользуйся",
    "воспользуйтесь", "выигрывай", "выиграй", "выигрывайте", "выигрывать", "гарантия",
    "гарантию", "гарантии", "гарантируем", "гарантированный", "гарантированная", "горбатиться",
    "горбатятся", "доход", "дохода", "доходов", "доступ", "доступа", "доступный", "доступные",
    "доступная", "доступного", "доступных", "ждет", "ждут", "ждите", "жми", "закреп", "закрепе",
    "закрепа", "забирай", "забираем", "забирайте", "заработать", "зарабатывать", "зарабатывает",
    "заработок", "заработка", "заработки", "зарегистрируй", "зарегистрируйся",
    "зарегистрироваться", "забрать", "забери", "заберите", "запуск", "запуска", "запуском",
    "запуски", "запустил", "запустила", "запустили", "запускаешь", "запускай", "заказ",
    "заказы", "заказа", "заказе", "заказывай", "заказывайте", "заказывать", "закажи", "закрыт",
    "закрытый", "закрытая", "закрытое", "закрытым", "закрытой", "закрыли", "закроем", "заявка",
    "заявку", "заявки", "заявкам", "запись", "записывай", "запиши", "запишись", "записаться",
    "записывайся", "здесь", "изжил", "изжила", "интенсив", "интенсиве", "интенсива", "канал",
    "канале", "каналов", "каналы", "конкурсе", "конкурс", "курс", "курса", "курсы", "купи",
    "купите", "криптомир", "криптомире", "криптоинвестиций", "криптоинвестиция", "кешбек",
    "кешбэк", "кешбэка", "кешбэком", "мастер-класс", "мастер-классы", "мастер-классе",
    "марафон", "марафоне", "моментально", "моментальный", "моментальная", "моментальные",
    "моментальных", "монетизация", "монетизации", "монетизировать", "монетизируй", "мини-курс",
    "мини-курса", "мини-курсе", "мини-курсы", "миллион", "миллиона", "миллионов", "миллионы",
    "миллиард", "миллиарда", "миллиардов", "миллиарды", "можете", "можешь", "нажать", "нажми",
    "нажмите", "начать", "начинать", "начни", "ниша", "нише", "ниши", "нищим", "нищими",
    "нищеброд", "нищебродов", "ноль", "нуля", "нулем", "научим", "научат", "научу", "научитесь",
    "образование", "образования", "онлайн", "освой", "освойте", "осваивать", "освоить",
    "оставить", "оставь", "оставлять", "открыть", "открыто", "открыт", "открыта", "открывается",
    "инвестиции", "инвестиция", "инвестируй", "интенсив", "интенсива", "интенисиве",
    "интенсивный", "подготовил", "подготовили", "переходи", "пройди", "проходи", "пройдите",
    "пройдем", "пройдём", "перейди", "перейти", "переходите", "покупай", "покупайте", "покажет",
    "покажут", "погрузись", "погрузитесь", "погружайтесь", "подписывайся", "подписывайтесь",
    "подписаться", "подпишись", "подпишитесь", "подпишитесь на", "подписка", "подписчиков",
    "подписчикам", "подписчиков", "подробности", "подробностей", "подробнее", "понадобится",
    "посмотреть", "прибыль", "прибыльный", "прибыльную", "присоединиться", "присоединяйтесь",
    "присоединяйся", "приватный", "приватная", "приватное", "приз", "приза", "призе", "призы",
    "призов", "приходи", "приходите", "продажи", "продать", "продающий", "продающая",
    "продащего", "продающие", "подработку", "подработки", "подработке", "подработка",
    "протестировать", "протестировал", "прокачай", "прокачаем", "прокачаете", "прокачают",
    "промокод", "промокоды", "промокодах", "промокоду", "расскажут", "расскажет",
    "рассказывает", "рассказывают", "регистрация", "регистрацию", "регистрируйся", "реклама",
    "рекламу", "рекламе", "рекламодатель", "рекламодателю", "рекламный", "рекламная",
    "рекламные", "рекламного", "рекламных", "раздачу", "раздаем", "раздаём", "раздадим",
    "рублей", "раздают", "создал", "создала", "создали", "создавать", "создать", "скачать",
    "скачай", "скачивать", "скачивай", "скачивайте", "скидку", "скидка", "скидкой", "смотреть",
    "смотрите", "собрали", "собрал", "собирали", "собрал", "становиться", "стал", "стать",
    "станешь", "становишься", "спешите", "спеши", "сервис", "сервиса", "сервисом", "ссылку",
    "ссылка", "ссылки", "ссылке", "ссылочка", "сохрани", "сохраните", "сохраняй", "тест",
    "тестирование", "тестировать", "тут", "урвать", "урви", "участвуй", "участие", "участвуйте",
    "учите", "учим", "учиться", "учитесь", "узнать", "узнавать", "хотите", "хочешь", "школа",
    "школе", "эксперт", "экспертный", "экпертов", "эксперты",
];

/// Minimum vocabulary matches for a text of `length` characters
pub fn min_matches_for_length(length: usize) -> usize {
    match length {
        0..=500 => 4,
        501..=1000 => 5,
        1001..=1500 => 6,
        _ => 7,
    }
}

/// Number of vocabulary entries found in already-lowercased text
pub fn count_ad_words(lowercased: &str) -> usize {
    AD_WORDS.iter().filter(|word| lowercased.contains(*word)).count()
}

/// Classify a post as advertising
pub fn is_advertisement(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let text = text.to_lowercase();
    if !REQUIRED_MARKERS.iter().any(|marker| text.contains(marker)) {
        return false;
    }

    count_ad_words(&text) >= min_matches_for_length(text.chars().count())
}
