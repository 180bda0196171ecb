//! Prompt templates for the three oracle round-trips. Placeholders in
//! `{braces}` are filled with plain string replacement; every template
//! demands bare JSON (or text) with a fixed key set, which the extractor
//! still validates defensively.

pub const CLASSIFY: &str = r#"Analyze the following text in Indonesian and determine what type of request it is:

1. Is it about a financial transaction (adding a new expense/income)?
2. Is it a query about existing financial data?
3. Is it just a general conversation?

Use chain of thought to analyze:
1. Does the text mention adding, recording, or inputting money, spending, or income?
2. Does it contain specific amounts or prices for a new transaction?
3. Is it describing a purchase, payment, or earning that happened?
4. Or is it asking questions about existing data (e.g., "what's my biggest expense?", "how much did I spend on food?")?

Text: "{text}"

Return a JSON object with these keys:
- is_transaction: true if it's about adding a new financial transaction, false otherwise
- is_data_query: true if it's asking about existing financial data, false otherwise
- reasoning: brief explanation of your decision
- response: a friendly response to the user (if it's just a conversation)

Only return valid JSON, nothing else."#;

pub const EXTRACT: &str = r#"Extract transaction information from the following text in Indonesian.

Use chain of thought to analyze:
1. Identify the date of the transaction (if not mentioned, use today's date which is {today})
2. Identify the amount - if there are quantities and unit prices, calculate the total
3. Determine if it's an expense or income
4. Categorize the transaction appropriately
5. Extract a brief description/note

Text: "{text}"

Return a JSON object with these keys:
- date: transaction date in YYYY-MM-DD format
- amount: numeric value without currency symbols
- type: either "expense" or "income"
- category: one of these categories: food, transport, shopping, bills, entertainment, health, education, income, or uncategorized
- note: brief description of the transaction
- reasoning: brief explanation of how you calculated the amount

Only return valid JSON, nothing else."#;

pub const EXTRACT_WITH_CONTEXT: &str = r#"Analisis teks pengguna berikut dalam konteks transaksi sebelumnya.

Transaksi Sebelumnya yang Sedang Diproses:
- Tanggal: {prior_date}
- Jumlah: Rp {prior_amount}
- Tipe: {prior_type}
- Kategori: {prior_category}
- Catatan: {prior_note}

Teks Pengguna Baru: "{text}"

Tugas Anda adalah memutuskan apakah teks baru ini:
1. **Merupakan pembaruan** dari transaksi sebelumnya (misalnya, menambah biaya ongkir, mengubah jumlah, dll.).
2. **Merupakan transaksi baru** yang sama sekali berbeda.
3. Hanya percakapan biasa.

Jika ini adalah pembaruan, hitung total baru dan gabungkan informasinya.
Jika ini adalah transaksi baru, ekstrak informasinya seperti biasa.

Return a JSON object with these keys:
- intent: "update_transaction", "new_transaction", or "conversation"
- date: transaction date in YYYY-MM-DD format (today is {today})
- amount: numeric value without currency symbols (total if updated)
- type: either "expense" or "income"
- category: one of these categories: food, transport, shopping, bills, entertainment, health, education, income, or uncategorized
- note: brief description of the transaction (combine if updated)
- reasoning: brief explanation of your decision

Only return valid JSON, nothing else."#;

pub const FRIENDLY: &str = r#"Generate a friendly, conversational response to the following text in Indonesian.
The user is talking to a finance chatbot, but this message is not about a transaction or data query.

Text: "{text}"

Your response should:
1. Be friendly and conversational
2. Acknowledge what the user said
3. Gently remind them that you're here to help with financial transactions and data analysis
4. Keep it brief and natural
5. Use Jaksel Indonesia style language such as gw, lo, mantap, etc.

Only return the response text, nothing else."#;

pub const DATA_QUERY: &str = r#"Analyze the following user query about financial data and provide a helpful response based on the data summary.

User query: "{text}"

Data summary:
{data_summary}

Your response should:
1. Directly answer the user's question based on the data
2. Provide specific numbers and details when possible
3. Be conversational and friendly
4. Use Jaksel Indonesia style language such as gw, lo, mantap, etc.
5. If the data doesn't contain enough information to answer the question, explain what data would be needed

Only return the response text, nothing else."#;

/// Canned apology for a failed conversational round-trip.
pub const FALLBACK_REPLY: &str = "Maaf, saya tidak dapat memproses pesan Anda. Saya di sini untuk membantu mencatat transaksi keuangan Anda dan menganalisis data Anda.";

/// Canned apology for a failed data-analysis round-trip.
pub const FALLBACK_ANALYSIS: &str =
    "Maaf, saya tidak dapat menganalisis data Anda saat ini. Silakan coba lagi nanti.";
