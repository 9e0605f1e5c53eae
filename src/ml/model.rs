// ============================================================
// Layer 5 — Span Model
// ============================================================
// A transformer encoder with a two-logit head: for every token
// it predicts how likely that token is to start, and to end, the
// answer span.
//
//   token ids ─► token emb + position emb
//             ─► N × [self-attention → add & norm → FFN → add & norm]
//             ─► final norm ─► Linear(d_model, 2) ─► start / end
//
// Padding positions are excluded from self-attention through the
// attention mask, so a window scores the same whether or not it
// was padded to fit a larger batch.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SpanModelConfig {
    pub vocab_size:  usize,
    /// Positional capacity; windows longer than this cannot be scored
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
}

impl SpanModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SpanModel<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let span_head  = LinearConfig::new(self.d_model, 2).init(device);
        SpanModel {
            token_embedding,
            position_embedding,
            layers,
            final_norm,
            span_head,
            vocab_size:  self.vocab_size,
            max_seq_len: self.max_seq_len,
        }
    }

    fn encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   MultiHeadAttentionConfig::new(self.d_model, self.num_heads).init(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + attn_output);
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + ffn_out)
    }
}

#[derive(Module, Debug)]
pub struct SpanModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub span_head:          Linear<B>,
    pub vocab_size:         usize,
    pub max_seq_len:        usize,
}

/// Per-token logits, both shaped [batch, seq_len].
pub struct SpanLogits<B: Backend> {
    pub start: Tensor<B, 2>,
    pub end:   Tensor<B, 2>,
}

impl<B: Backend> SpanModel<B> {
    /// input_ids, attention_mask: [batch, seq_len] → start/end logits [batch, seq_len]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> SpanLogits<B> {
        let [batch_size, seq_len] = input_ids.dims();

        let tok_emb   = self.token_embedding.forward(input_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb   = self.position_embedding.forward(positions);

        let pad_mask = attention_mask.equal_elem(0);
        let mut x = tok_emb + pos_emb;
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x);

        // [batch, seq_len, 2] split into start / end columns
        let logits = self.span_head.forward(x);
        let start = logits.clone()
            .slice([0..batch_size, 0..seq_len, 0..1])
            .reshape([batch_size, seq_len]);
        let end = logits
            .slice([0..batch_size, 0..seq_len, 1..2])
            .reshape([batch_size, seq_len]);

        SpanLogits { start, end }
    }
}
